//! Commands module - service layer for WAF Policy Autopilot operations

mod apply;
pub(crate) mod plan;
pub(crate) mod service;

pub use service::WafPolicyAutopilotService;

#[cfg(test)]
pub(crate) mod fakes;
