use std::collections::HashMap;

use crate::context::Context;
use crate::strategy::StrategyHandler;
use crate::value::Value;

const HOST_NAMES_PARAM: &str = "hostNames";
const REMOTE_ADDRESS_PARAM: &str = "remoteAddress";
const USER_IDS_PARAM: &str = "userIds";

/// The strategies every client knows without registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinStrategy {
    /// `default`: always grants.
    Default,
    /// `applicationHostname`: grants when the context host name is listed in `hostNames`.
    ApplicationHostname,
    /// `remoteAddress`: grants when the context IP address is listed in `remoteAddress`.
    RemoteAddress,
    /// `userWithId`: grants when the context user id is listed in `userIds`.
    UserWithId,
}

impl BuiltinStrategy {
    pub(crate) const ALL: [BuiltinStrategy; 4] = [
        BuiltinStrategy::Default,
        BuiltinStrategy::ApplicationHostname,
        BuiltinStrategy::RemoteAddress,
        BuiltinStrategy::UserWithId,
    ];

    /// The name the flag service uses for the strategy.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinStrategy::Default => "default",
            BuiltinStrategy::ApplicationHostname => "applicationHostname",
            BuiltinStrategy::RemoteAddress => "remoteAddress",
            BuiltinStrategy::UserWithId => "userWithId",
        }
    }
}

impl StrategyHandler for BuiltinStrategy {
    fn is_enabled(&self, params: &HashMap<String, String>, context: &Context, _: &[Value]) -> bool {
        match self {
            BuiltinStrategy::Default => true,
            BuiltinStrategy::ApplicationHostname => {
                listed(params, HOST_NAMES_PARAM, context.get_hostname())
            }
            BuiltinStrategy::RemoteAddress => {
                listed(params, REMOTE_ADDRESS_PARAM, context.get_ip_address())
            }
            BuiltinStrategy::UserWithId => listed(params, USER_IDS_PARAM, context.get_user_id()),
        }
    }
}

fn listed(params: &HashMap<String, String>, param: &str, value: Option<&str>) -> bool {
    let (Some(list), Some(value)) = (params.get(param), value) else {
        return false;
    };
    list.split(',').map(str::trim).any(|item| item == value)
}
