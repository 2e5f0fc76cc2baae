use ibafit::engine::config::DeParameter;
use ibafit::engine::problem::Baseline;

/// A fully resolved session: the physical configuration plus the fit settings.
#[derive(Debug, Clone)]
pub struct Session {
    pub baseline: Baseline,
    pub channels: usize,
    pub evolution: DeParameter,
}
