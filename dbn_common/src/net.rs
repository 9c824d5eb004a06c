//! Live gateway addressing.

/// Domain suffix of the live subscription gateways.
pub const LIVE_HOST_SUFFIX: &str = ".lsg.databento.com";

/// TCP port of the live subscription gateways.
pub const LIVE_API_PORT: u16 = 13000;

/// Lowercases `dataset` and replaces `.` with `-`, e.g. `GLBX.MDP3` becomes
/// `glbx-mdp3`.
pub fn dataset_to_hostname(dataset: &str) -> String {
    dataset.to_lowercase().replace('.', "-")
}

/// Default gateway host for `dataset`.
pub fn gateway_host(dataset: &str) -> String {
    format!("{}{}", dataset_to_hostname(dataset), LIVE_HOST_SUFFIX)
}
