use std::collections::BTreeMap;
use std::str::FromStr;

use itertools::Itertools;

use crate::scheduler::Scheduler;
use crate::schedulers::adaptive::AdaptiveScheduler;
use crate::schedulers::greedy::GreedyScheduler;
use crate::schedulers::heft::HeftScheduler;

/// Scheduler name with optional parameters, written as `name[key=value,...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerParams {
    name: String,
    params: BTreeMap<String, String>,
}

impl SchedulerParams {
    pub fn from_str(s: &str) -> Option<Self> {
        let Some(open) = s.find('[') else {
            return Some(Self {
                name: s.to_string(),
                params: BTreeMap::new(),
            });
        };
        if !s.ends_with(']') {
            return None;
        }

        let mut params = BTreeMap::new();
        let inner = &s[open + 1..s.len() - 1];
        if !inner.is_empty() {
            for param in inner.split(',') {
                let pos = param.find('=')?;
                params.insert(param[..pos].trim().to_string(), param[pos + 1..].trim().to_string());
            }
        }

        Some(Self {
            name: s[..open].to_string(),
            params,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get<T: FromStr, K: AsRef<str>>(&self, name: K) -> Option<T> {
        self.params.get(name.as_ref()).and_then(|s| s.parse().ok())
    }

    /// Returns `default` if the parameter is absent and `None` if it is present but can't be parsed.
    pub fn get_or<T: FromStr, K: AsRef<str>>(&self, name: K, default: T) -> Option<T> {
        match self.params.get(name.as_ref()) {
            Some(s) => s.parse().ok(),
            None => Some(default),
        }
    }
}

impl std::fmt::Display for SchedulerParams {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.params.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(
                f,
                "{}[{}]",
                self.name,
                self.params.iter().map(|(k, v)| format!("{k}={v}")).join(",")
            )
        }
    }
}

pub fn default_scheduler_resolver(params: &SchedulerParams) -> Option<Box<dyn Scheduler>> {
    match params.name() {
        "greedy" => Some(Box::new(GreedyScheduler::new())),
        "heft" => Some(Box::new(HeftScheduler::new())),
        "adaptive" => AdaptiveScheduler::from_scheduler_params(params).map(|s| Box::new(s) as Box<dyn Scheduler>),
        _ => None,
    }
}
