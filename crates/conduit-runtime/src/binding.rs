//! Per-instance binding state machine.

use conduit_api::{
    ConduitError, ConnectionSpec, Effect, FormHandle, InstanceId, LifecycleState, Mode,
    Resolution, ResolvedState, SessionContext, Snapshot,
};
use conduit_core::{detect_mode, refresh, release, resolve};
use tracing::{debug, info};

/// An outstanding resolution for one instance.
///
/// The host resolves `spec` against `previous` (possibly off the UI path)
/// and hands the result back through [`Binding::commit`].
#[derive(Debug, Clone)]
pub struct Ticket {
    pub id: InstanceId,
    pub spec: ConnectionSpec,
    pub previous: Option<Snapshot>,
    generation: u64,
}

impl Ticket {
    /// Resolve this ticket, reusing `previous` when the spec is unchanged.
    pub fn resolve(&self, context: &SessionContext) -> Resolution {
        resolve(&self.spec, context, self.previous.as_ref())
    }

    /// Resolve this ticket without reuse.
    pub fn refresh(&self, context: &SessionContext) -> Resolution {
        refresh(&self.spec, context, self.previous.as_ref())
    }
}

/// Result of committing a [`Ticket`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// The state was stored; these effects must be applied.
    Applied(Vec<Effect>),
    /// The instance was torn down or a newer ticket superseded this one.
    Discarded,
}

/// The connection of one widget instance and its last resolution.
///
/// This is the base object widget types delegate to: it owns the spec, the
/// snapshot used for reuse on the next resolve, and any form or stream
/// handles inside it. The connection kind is fixed; [`Binding::update`]
/// with a different kind releases everything and starts over.
#[derive(Debug, Clone)]
pub struct Binding {
    id: InstanceId,
    spec: ConnectionSpec,
    snapshot: Option<Snapshot>,
    visible: ResolvedState,
    lifecycle: LifecycleState,
    generation: u64,
    revision: u64,
}

impl Binding {
    pub fn new(id: impl Into<InstanceId>, spec: ConnectionSpec) -> Self {
        Self {
            id: id.into(),
            spec,
            snapshot: None,
            visible: ResolvedState::pending(),
            lifecycle: LifecycleState::Uninitialized,
            generation: 0,
            revision: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn spec(&self) -> &ConnectionSpec {
        &self.spec
    }

    pub fn mode(&self) -> Mode {
        detect_mode(&self.spec)
    }

    /// What the renderer should show right now.
    pub fn state(&self) -> &ResolvedState {
        &self.visible
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    /// Bumped whenever a commit changes the resolved state.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_torn_down(&self) -> bool {
        self.lifecycle == LifecycleState::TornDown
    }

    /// Start resolving `spec`. The visible state turns to loading until the
    /// ticket is committed.
    pub fn begin(&mut self, spec: ConnectionSpec) -> Result<Ticket, ConduitError> {
        self.ensure_live()?;
        if spec.kind() != self.spec.kind() {
            return Err(ConduitError::Conflict(format!(
                "instance {} is bound to {} and cannot switch to {}",
                self.id,
                self.spec.kind(),
                spec.kind()
            )));
        }

        self.generation += 1;
        self.lifecycle = LifecycleState::Resolving;
        self.visible = ResolvedState::pending();
        self.spec = spec.clone();
        Ok(Ticket {
            id: self.id.clone(),
            spec,
            previous: self.snapshot.clone(),
            generation: self.generation,
        })
    }

    pub fn commit(&mut self, ticket: Ticket, resolution: Resolution) -> Commit {
        if self.is_torn_down() || ticket.id != self.id || ticket.generation != self.generation {
            debug!(
                instance = %ticket.id,
                generation = ticket.generation,
                "discarding stale resolution"
            );
            return Commit::Discarded;
        }

        let changed = self.snapshot.as_ref().map(|s| &s.state) != Some(&resolution.state);
        if changed {
            self.revision += 1;
        }
        self.visible = resolution.state.clone();
        self.snapshot = Some(Snapshot::new(ticket.spec, resolution.state));
        self.lifecycle = LifecycleState::Resolved;
        Commit::Applied(resolution.effects)
    }

    /// First resolution. Returns the effects to apply.
    pub fn mount(&mut self, context: &SessionContext) -> Result<Vec<Effect>, ConduitError> {
        self.ensure_live()?;
        if self.lifecycle != LifecycleState::Uninitialized {
            return Err(ConduitError::Conflict(format!(
                "instance {} is already mounted",
                self.id
            )));
        }
        info!(instance = %self.id, kind = %self.spec.kind(), "mounting widget");
        let ticket = self.begin(self.spec.clone())?;
        let resolution = ticket.resolve(context);
        Ok(self.commit_sync(ticket, resolution))
    }

    /// Supply the spec for a re-render. Structurally equal specs keep the
    /// current state; a different kind recreates the binding.
    pub fn update(
        &mut self,
        spec: ConnectionSpec,
        context: &SessionContext,
    ) -> Result<Vec<Effect>, ConduitError> {
        self.ensure_live()?;
        if spec.kind() != self.spec.kind() {
            let mut effects = self.renew(spec);
            effects.extend(self.mount(context)?);
            return Ok(effects);
        }
        if self.lifecycle == LifecycleState::Uninitialized {
            self.spec = spec;
            return self.mount(context);
        }
        let mut effects = Vec::new();
        if !spec.same_binding(&self.spec) {
            debug!(instance = %self.id, "connection key changed, rebinding");
            effects.extend(self.snapshot.take().map(|s| release(&s)).unwrap_or_default());
        }
        let ticket = self.begin(spec)?;
        let resolution = ticket.resolve(context);
        effects.extend(self.commit_sync(ticket, resolution));
        Ok(effects)
    }

    /// Resolve the current spec again, bypassing reuse.
    pub fn refresh(&mut self, context: &SessionContext) -> Result<Vec<Effect>, ConduitError> {
        self.ensure_live()?;
        if self.lifecycle == LifecycleState::Uninitialized {
            return self.mount(context);
        }
        let ticket = self.begin(self.spec.clone())?;
        let resolution = ticket.refresh(context);
        Ok(self.commit_sync(ticket, resolution))
    }

    /// Resolve again after an external change (stream contents, a delivery,
    /// connectivity). The revision advances even when the resolved state is
    /// equal, since what the instance shows has changed.
    pub fn invalidate(&mut self, context: &SessionContext) -> Result<Vec<Effect>, ConduitError> {
        let revision = self.revision;
        let effects = self.refresh(context)?;
        if self.revision == revision {
            self.revision += 1;
        }
        Ok(effects)
    }

    /// Release the binding. Returns the unsubscribe effect for a registered
    /// subscription, if any. Outstanding tickets are discarded on commit.
    pub fn teardown(&mut self) -> Result<Vec<Effect>, ConduitError> {
        self.ensure_live()?;
        info!(instance = %self.id, kind = %self.spec.kind(), "tearing down widget");
        let effects = self.snapshot.take().map(|s| release(&s)).unwrap_or_default();
        self.lifecycle = LifecycleState::TornDown;
        self.visible = ResolvedState::ready();
        self.generation += 1;
        Ok(effects)
    }

    /// Drop the current resolution and rebind to `spec` as a fresh,
    /// unmounted instance. Returns the effects releasing the old binding.
    pub fn renew(&mut self, spec: ConnectionSpec) -> Vec<Effect> {
        info!(
            instance = %self.id,
            from = %self.spec.kind(),
            to = %spec.kind(),
            "recreating widget binding"
        );
        let effects = self.snapshot.take().map(|s| release(&s)).unwrap_or_default();
        self.spec = spec;
        self.visible = ResolvedState::pending();
        self.lifecycle = LifecycleState::Uninitialized;
        self.generation += 1;
        effects
    }

    /// Replace the form handle, e.g. after validation or a rejected submit.
    pub fn replace_form(&mut self, form: FormHandle) -> Result<(), ConduitError> {
        self.ensure_live()?;
        if self.visible.form_handle.is_none() {
            return Err(ConduitError::Validation(format!(
                "instance {} has no form",
                self.id
            )));
        }
        self.visible.form_handle = Some(form.clone());
        if let Some(snapshot) = self.snapshot.as_mut() {
            snapshot.state.form_handle = Some(form);
        }
        self.revision += 1;
        Ok(())
    }

    fn commit_sync(&mut self, ticket: Ticket, resolution: Resolution) -> Vec<Effect> {
        match self.commit(ticket, resolution) {
            Commit::Applied(effects) => effects,
            Commit::Discarded => Vec::new(),
        }
    }

    fn ensure_live(&self) -> Result<(), ConduitError> {
        if self.is_torn_down() {
            Err(ConduitError::TornDown(self.id.clone()))
        } else {
            Ok(())
        }
    }
}
