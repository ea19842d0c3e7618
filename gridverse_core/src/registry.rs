use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Named parameters passed to a function constructor.
pub type Params = BTreeMap<String, ParamValue>;

/// Value of a single function parameter.
///
/// Object kinds, distance functions and reductions are given as text and
/// parsed by the constructor that consumes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Functions(Vec<FunctionSpec>),
    Numbers(Vec<f64>),
}

impl ParamValue {
    fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "a boolean",
            ParamValue::Number(_) => "a number",
            ParamValue::Text(_) => "text",
            ParamValue::Functions(_) => "a list of functions",
            ParamValue::Numbers(_) => "a list of numbers",
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<Vec<FunctionSpec>> for ParamValue {
    fn from(value: Vec<FunctionSpec>) -> Self {
        ParamValue::Functions(value)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(value: Vec<f64>) -> Self {
        ParamValue::Numbers(value)
    }
}

/// A function name together with the parameters to build it with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default)]
    pub params: Params,
}

impl FunctionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        FunctionSpec {
            name: name.into(),
            params: Params::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

/// Parameter names a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

impl Signature {
    pub const NONE: Signature = Signature::new(&[], &[]);

    pub const fn new(required: &'static [&'static str], optional: &'static [&'static str]) -> Self {
        Signature { required, optional }
    }

    fn accepts(&self, key: &str) -> bool {
        self.required.contains(&key) || self.optional.contains(&key)
    }

    /// Checks that every required parameter is present and no unknown one is.
    pub fn check(&self, function: &str, params: &Params) -> Result<(), ConfigError> {
        if let Some(key) = self.required.iter().find(|key| !params.contains_key(**key)) {
            return Err(ConfigError::MissingParameter {
                function: function.to_string(),
                key: key.to_string(),
            });
        }

        let unrecognized: Vec<String> = params
            .keys()
            .filter(|key| !self.accepts(key))
            .cloned()
            .collect();
        if !unrecognized.is_empty() {
            return Err(ConfigError::UnrecognizedParameter {
                function: function.to_string(),
                keys: unrecognized,
            });
        }

        Ok(())
    }
}

/// Typed, validated access to the parameters of one constructor call.
#[derive(Debug, Clone, Copy)]
pub struct Arguments<'a> {
    function: &'a str,
    params: &'a Params,
}

impl<'a> Arguments<'a> {
    pub fn new(function: &'a str, params: &'a Params) -> Self {
        Arguments { function, params }
    }

    pub fn function(&self) -> &'a str {
        self.function
    }

    fn invalid(&self, key: &str, reason: String) -> ConfigError {
        ConfigError::InvalidParameter {
            function: self.function.to_string(),
            key: key.to_string(),
            reason,
        }
    }

    fn required(&self, key: &str) -> Result<&'a ParamValue, ConfigError> {
        self.params
            .get(key)
            .ok_or_else(|| ConfigError::MissingParameter {
                function: self.function.to_string(),
                key: key.to_string(),
            })
    }

    fn mismatch(&self, key: &str, expected: &str, found: &ParamValue) -> ConfigError {
        self.invalid(key, format!("expected {expected}, found {}", found.type_name()))
    }

    pub fn number(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        match self.params.get(key) {
            None => Ok(default),
            Some(ParamValue::Number(value)) => Ok(*value),
            Some(other) => Err(self.mismatch(key, "a number", other)),
        }
    }

    pub fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.params.get(key) {
            None => Ok(default),
            Some(ParamValue::Bool(value)) => Ok(*value),
            Some(other) => Err(self.mismatch(key, "a boolean", other)),
        }
    }

    /// Parses a required text parameter.
    pub fn parse<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.required(key)? {
            ParamValue::Text(text) => text.parse().map_err(|e: T::Err| self.invalid(key, e.to_string())),
            other => Err(self.mismatch(key, "text", other)),
        }
    }

    /// Parses an optional text parameter, falling back to `default`.
    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        if self.params.contains_key(key) {
            self.parse(key)
        } else {
            Ok(default)
        }
    }

    pub fn functions(&self, key: &str) -> Result<&'a [FunctionSpec], ConfigError> {
        match self.required(key)? {
            ParamValue::Functions(specs) => Ok(specs),
            other => Err(self.mismatch(key, "a list of functions", other)),
        }
    }

    pub fn numbers(&self, key: &str) -> Result<&'a [f64], ConfigError> {
        match self.required(key)? {
            ParamValue::Numbers(values) => Ok(values),
            // `[]` deserializes as an empty function list
            ParamValue::Functions(specs) if specs.is_empty() => Ok(&[]),
            other => Err(self.mismatch(key, "a list of numbers", other)),
        }
    }
}

/// Builds a function of family `F` from validated arguments.
///
/// The registry is passed along so that combinators can build their nested
/// functions by name.
pub type Constructor<F> =
    Box<dyn Fn(&Arguments<'_>, &FunctionRegistry<F>) -> Result<Box<F>, ConfigError>>;

struct Entry<F: ?Sized> {
    signature: Signature,
    constructor: Constructor<F>,
}

/// Name-to-constructor table for one family of functions (transition,
/// reward or terminating).
///
/// Names are unique: registering an existing name, built-in or custom, is an
/// error.
pub struct FunctionRegistry<F: ?Sized> {
    family: &'static str,
    entries: HashMap<String, Entry<F>>,
}

impl<F: ?Sized> FunctionRegistry<F> {
    /// Creates an empty registry.
    pub fn new(family: &'static str) -> Self {
        FunctionRegistry {
            family,
            entries: HashMap::new(),
        }
    }

    pub fn register<C>(&mut self, name: &str, signature: Signature, constructor: C) -> Result<(), ConfigError>
    where
        C: Fn(&Arguments<'_>, &FunctionRegistry<F>) -> Result<Box<F>, ConfigError> + 'static,
    {
        if self.entries.contains_key(name) {
            return Err(ConfigError::DuplicateFunction {
                family: self.family,
                name: name.to_string(),
            });
        }
        debug!(family = self.family, name, "registering function");
        self.entries.insert(
            name.to_string(),
            Entry {
                signature,
                constructor: Box::new(constructor),
            },
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in alphabetical order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Looks up `name`, validates `params` against its signature, and builds
    /// the function.
    pub fn build(&self, name: &str, params: &Params) -> Result<Box<F>, ConfigError> {
        let entry = self.entries.get(name).ok_or_else(|| ConfigError::UnknownFunction {
            family: self.family,
            name: name.to_string(),
        })?;
        entry.signature.check(name, params)?;
        (entry.constructor)(&Arguments::new(name, params), self)
    }

    pub fn build_spec(&self, spec: &FunctionSpec) -> Result<Box<F>, ConfigError> {
        self.build(&spec.name, &spec.params)
    }

    pub fn build_all(&self, specs: &[FunctionSpec]) -> Result<Vec<Box<F>>, ConfigError> {
        specs.iter().map(|spec| self.build_spec(spec)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Constant {
        fn value(&self) -> f64;
    }

    struct Fixed(f64);

    impl Constant for Fixed {
        fn value(&self) -> f64 {
            self.0
        }
    }

    fn registry() -> FunctionRegistry<dyn Constant> {
        let mut registry: FunctionRegistry<dyn Constant> = FunctionRegistry::new("constant");
        registry
            .register("fixed", Signature::new(&["value"], &["scale"]), |args, _| {
                let value = args.number("value", 0.0)? * args.number("scale", 1.0)?;
                Ok(Box::new(Fixed(value)) as Box<dyn Constant>)
            })
            .unwrap();
        registry
    }

    #[test]
    fn builds_with_defaults() {
        let registry = registry();
        let spec = FunctionSpec::new("fixed").with("value", 2.0);
        assert_eq!(registry.build_spec(&spec).unwrap().value(), 2.0);
        let spec = spec.with("scale", 3.0);
        assert_eq!(registry.build_spec(&spec).unwrap().value(), 6.0);
    }

    #[test]
    fn rejects_bad_parameters() {
        let registry = registry();
        assert!(matches!(
            registry.build_spec(&FunctionSpec::new("fixed")),
            Err(ConfigError::MissingParameter { key, .. }) if key == "value"
        ));
        assert!(matches!(
            registry.build_spec(&FunctionSpec::new("fixed").with("value", 1.0).with("foo", 1.0)),
            Err(ConfigError::UnrecognizedParameter { keys, .. }) if keys == vec!["foo".to_string()]
        ));
        assert!(matches!(
            registry.build_spec(&FunctionSpec::new("fixed").with("value", "one")),
            Err(ConfigError::InvalidParameter { key, .. }) if key == "value"
        ));
        assert!(matches!(
            registry.build_spec(&FunctionSpec::new("missing")),
            Err(ConfigError::UnknownFunction { name, .. }) if name == "missing"
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = registry();
        let result = registry.register("fixed", Signature::NONE, |_, _| {
            Ok(Box::new(Fixed(0.0)) as Box<dyn Constant>)
        });
        assert_eq!(
            result,
            Err(ConfigError::DuplicateFunction {
                family: "constant",
                name: "fixed".to_string()
            })
        );
        assert_eq!(registry.names(), vec!["fixed"]);
    }

    #[test]
    fn number_lists_deserialize_after_function_lists() {
        let params: Params = serde_json::from_str(r#"{"weights": [0.5, 2], "empty": []}"#).unwrap();
        assert_eq!(params["weights"], ParamValue::Numbers(vec![0.5, 2.0]));
        let args = Arguments::new("weighted", &params);
        assert_eq!(args.numbers("weights").unwrap(), &[0.5, 2.0]);
        assert!(args.numbers("empty").unwrap().is_empty());
        assert!(args.functions("weights").is_err());
    }

    #[test]
    fn params_deserialize_from_json() {
        let spec: FunctionSpec = serde_json::from_str(
            r#"{"name": "reduce_sum", "params": {"reward_functions": [
                {"name": "living_reward", "params": {"reward": -1}},
                {"name": "reach_exit"}
            ]}}"#,
        )
        .unwrap();
        match &spec.params["reward_functions"] {
            ParamValue::Functions(specs) => {
                assert_eq!(specs.len(), 2);
                assert_eq!(specs[0].params["reward"], ParamValue::Number(-1.0));
                assert!(specs[1].params.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
