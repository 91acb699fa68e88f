use conduit_api::{ConnectionSpec, Mode};

/// `Static` specs are fed by their caller; every other kind is connected.
pub fn detect_mode(spec: &ConnectionSpec) -> Mode {
    match spec {
        ConnectionSpec::Static => Mode::Static,
        ConnectionSpec::Interface { .. }
        | ConnectionSpec::ResourceQuery { .. }
        | ConnectionSpec::Stream { .. }
        | ConnectionSpec::FormCreate { .. }
        | ConnectionSpec::FormUpdate { .. }
        | ConnectionSpec::ActionInvocation { .. }
        | ConnectionSpec::Subscription { .. } => Mode::Connected,
    }
}
