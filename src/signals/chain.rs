//! Chain-of-responsibility composition of indicators.
//!
//! Steps run in order against the same window. Any step without a signal voids the
//! chain and stops evaluation. Under [`SignPolicy::Strict`] a step whose direction
//! disagrees with the first step also voids the chain.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::trace;

use crate::error::ConfigError;
use crate::indicators::{Indicator, IndicatorParams, IndicatorRegistry};
use crate::models::{ChainEntry, ChainResult, SignalType, Window};

pub const DEFAULT_CHAIN_NAME: &str = "Chain";

/// How a chain treats steps that disagree on direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignPolicy {
    /// A direction flip voids the chain.
    #[default]
    Strict,
    /// Directions may differ; the first step's direction is reported.
    Lenient,
}

impl FromStr for SignPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(SignPolicy::Strict),
            "lenient" => Ok(SignPolicy::Lenient),
            other => Err(ConfigError::InvalidValue {
                key: "CHAIN_SIGN_POLICY".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

pub enum ChainStep {
    Indicator(Box<dyn Indicator>),
    Chain(Chain),
}

impl fmt::Debug for ChainStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainStep::Indicator(indicator) => write!(f, "Indicator({})", indicator.name()),
            ChainStep::Chain(chain) => write!(f, "Chain({})", chain.name),
        }
    }
}

#[derive(Debug)]
pub struct Chain {
    name: String,
    steps: Vec<ChainStep>,
    policy: SignPolicy,
}

impl Chain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            policy: SignPolicy::default(),
        }
    }

    /// Length-one chain that passes the indicator's result straight through.
    pub fn single(indicator: Box<dyn Indicator>) -> Self {
        let name = indicator.name().to_string();
        Self::new(name).then(indicator)
    }

    pub fn with_policy(mut self, policy: SignPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn then(mut self, indicator: Box<dyn Indicator>) -> Self {
        self.steps.push(ChainStep::Indicator(indicator));
        self
    }

    pub fn then_chain(mut self, chain: Chain) -> Self {
        self.steps.push(ChainStep::Chain(chain));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> SignPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Evaluate every step against `window`. `None` means the chain is void.
    pub fn evaluate(&self, window: &Window) -> Option<ChainResult> {
        let mut running: Option<SignalType> = None;
        let mut entries: Vec<ChainEntry> = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let (signal, step_entries) = match step {
                ChainStep::Indicator(indicator) => {
                    let result = indicator.evaluate(window);
                    let Some(signal) = result.signal else {
                        trace!(chain = %self.name, indicator = indicator.name(), "chain void: no signal");
                        return None;
                    };
                    let entry = ChainEntry {
                        indicator: indicator.name().to_string(),
                        signal,
                        metadata: result.metadata,
                    };
                    (signal, vec![entry])
                }
                ChainStep::Chain(nested) => {
                    let result = nested.evaluate(window)?;
                    (result.signal, result.entries)
                }
            };

            match running {
                None => running = Some(signal),
                Some(current) if current != signal && self.policy == SignPolicy::Strict => {
                    trace!(chain = %self.name, from = %current, to = %signal, "chain void: sign flip");
                    return None;
                }
                Some(_) => {}
            }
            entries.extend(step_entries);
        }

        Some(ChainResult {
            chain: self.name.clone(),
            signal: running?,
            entries,
        })
    }
}

#[derive(Debug, Clone)]
enum SpecStep {
    Indicator(String),
    Chain(ChainSpec),
}

/// Immutable, validated description of a chain. Builds a fresh [`Chain`] per
/// evaluation so no state is shared across instruments or passes.
#[derive(Debug, Clone)]
pub struct ChainSpec {
    name: String,
    steps: Vec<SpecStep>,
    policy: SignPolicy,
    default_params: IndicatorParams,
    params: HashMap<String, IndicatorParams>,
    registry: Arc<IndicatorRegistry>,
}

impl ChainSpec {
    /// Resolve indicator keys against `registry`, failing fast on unknown keys or an
    /// empty set.
    pub fn resolve<S: AsRef<str>>(
        name: impl Into<String>,
        keys: &[S],
        registry: Arc<IndicatorRegistry>,
    ) -> Result<Self, ConfigError> {
        let resolved = registry.resolve(keys)?;
        Ok(Self {
            name: name.into(),
            steps: resolved.into_iter().map(SpecStep::Indicator).collect(),
            policy: SignPolicy::default(),
            default_params: IndicatorParams::default(),
            params: HashMap::new(),
            registry,
        })
    }

    pub fn with_policy(mut self, policy: SignPolicy) -> Self {
        self.policy = policy;
        for step in &mut self.steps {
            if let SpecStep::Chain(nested) = step {
                *nested = nested.clone().with_policy(policy);
            }
        }
        self
    }

    pub fn with_default_params(mut self, params: IndicatorParams) -> Self {
        self.default_params = params;
        self
    }

    /// Override the parameters for one indicator key.
    pub fn with_params(mut self, key: &str, params: IndicatorParams) -> Self {
        self.params.insert(key.to_lowercase(), params);
        self
    }

    pub fn then_chain(mut self, nested: ChainSpec) -> Self {
        self.steps.push(SpecStep::Chain(nested));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> SignPolicy {
        self.policy
    }

    /// Indicator keys in evaluation order, nested chains flattened.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for step in &self.steps {
            match step {
                SpecStep::Indicator(key) => keys.push(key.clone()),
                SpecStep::Chain(nested) => keys.extend(nested.keys()),
            }
        }
        keys
    }

    pub fn build(&self) -> Chain {
        let mut chain = Chain::new(self.name.clone()).with_policy(self.policy);
        for step in &self.steps {
            match step {
                SpecStep::Indicator(key) => {
                    let params = self.params.get(key).unwrap_or(&self.default_params);
                    // keys were validated against this registry in `resolve`
                    if let Some(indicator) = self.registry.build(key, params) {
                        chain = chain.then(indicator);
                    }
                }
                SpecStep::Chain(nested) => chain = chain.then_chain(nested.build()),
            }
        }
        chain
    }

    pub fn evaluate(&self, window: &Window) -> Option<ChainResult> {
        self.build().evaluate(window)
    }
}
