//! Sensitivity tables and their assembly from raw factor matrices.

pub mod assembler;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use assembler::{
    fold_generator_matrix, fold_pst_matrix, reference_values, LeverLayout,
    SensitivityResultAssembler,
};

/// Key of the base-case value of each function in a case entry.
pub const REFERENCE_KEY: &str = "referenceCurrent";

/// Round to 6 decimals; NaN, infinities and values below 1e-6 become 0.
pub fn round_sensitivity(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let rounded = (value * 1e6).round() / 1e6;
    if rounded.abs() < 1e-6 {
        0.0
    } else {
        rounded
    }
}

/// `function -> case -> lever -> value`, zero when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensitivityTable(BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>>);

impl SensitivityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, function: &str, case: &str, lever: &str, value: f64) {
        self.0
            .entry(function.to_string())
            .or_default()
            .entry(case.to_string())
            .or_default()
            .insert(lever.to_string(), value);
    }

    pub fn get(&self, function: &str, case: &str, lever: &str) -> f64 {
        self.0
            .get(function)
            .and_then(|cases| cases.get(case))
            .and_then(|levers| levers.get(lever))
            .copied()
            .unwrap_or(0.0)
    }

    /// Whether `case` has an entry for `function`; unconverged cases have none.
    pub fn has_case(&self, function: &str, case: &str) -> bool {
        self.0
            .get(function)
            .is_some_and(|cases| cases.contains_key(case))
    }

    /// Add the levers of one case; existing levers of that case are overwritten.
    pub fn merge_case<I>(&mut self, function: &str, case: &str, levers: I)
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        self.0
            .entry(function.to_string())
            .or_default()
            .entry(case.to_string())
            .or_default()
            .extend(levers);
    }

    pub fn functions(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn cases(&self, function: &str) -> impl Iterator<Item = &str> {
        self.0
            .get(function)
            .into_iter()
            .flat_map(|cases| cases.keys().map(String::as_str))
    }

    pub fn levers(&self, function: &str, case: &str) -> Option<&BTreeMap<String, f64>> {
        self.0.get(function)?.get(case)
    }

    /// Rename functions with `rename`; functions mapped to the same name are merged.
    pub fn rename_functions(self, rename: impl Fn(&str) -> String) -> Self {
        let mut renamed = SensitivityTable::new();
        for (function, cases) in self.0 {
            for (case, levers) in cases {
                renamed.merge_case(&rename(&function), &case, levers);
            }
        }
        renamed
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
