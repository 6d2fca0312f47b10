//! Folding raw factor matrices into per-lever sensitivity tables.
//!
//! - Redispatchable generators are reported one by one.
//! - An HVDC lever is `row(end generator) - row(origin generator)`; the
//!   fictitious terminal generators themselves never show up.
//! - The counter-trading pool is reported as a single lever, the key-weighted
//!   sum of its generators' rows.
//! - PSTs are reported per tap-angle degree.
//!
//! Every raw sensitivity goes through [`round_sensitivity`] first; reference values do not.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use gridsens_core::{SensitivityMatrix, SensitivityResult};

use super::{round_sensitivity, SensitivityTable, REFERENCE_KEY};
use crate::contingency::orchestrator::{
    GENERATORS_EQ_LINE_MATRIX, GENERATORS_MATRIX, PSTS_EQ_LINE_MATRIX, PSTS_MATRIX,
};
use crate::counter_trading::COUNTER_TRADING_KEY;
use crate::hvdc::{TerminalGenerators, EQUIVALENT_LINE_PREFIX};
use crate::output::Sensitivities;

/// Which variable rows make up which reported lever.
#[derive(Debug, Clone, Default)]
pub struct LeverLayout {
    /// Generators reported individually
    pub generators: Vec<String>,
    /// Merged HVDC lever id -> terminal generators
    pub hvdc_levers: BTreeMap<String, TerminalGenerators>,
    /// Counter-trading pool: generator id -> repartition key
    pub counter_trading: BTreeMap<String, f64>,
    pub psts: Vec<String>,
}

impl LeverLayout {
    /// Every generator variable the generator matrices must carry, in id order.
    pub fn generator_variables(&self) -> Vec<String> {
        let mut variables: BTreeSet<String> = self.generators.iter().cloned().collect();
        variables.extend(self.counter_trading.keys().cloned());
        for terminals in self.hvdc_levers.values() {
            variables.insert(terminals.origin.clone());
            variables.insert(terminals.end.clone());
        }
        variables.into_iter().collect()
    }

    fn individual_generators(&self) -> impl Iterator<Item = &String> {
        let hidden: BTreeSet<&str> = self
            .hvdc_levers
            .values()
            .flat_map(|t| [t.origin.as_str(), t.end.as_str()])
            .chain(self.counter_trading.keys().map(String::as_str))
            .collect();
        self.generators
            .iter()
            .filter(move |g| !hidden.contains(g.as_str()))
    }
}

struct Rows<'a> {
    matrix: &'a SensitivityMatrix,
    index: HashMap<&'a str, usize>,
}

impl<'a> Rows<'a> {
    fn new(matrix: &'a SensitivityMatrix) -> Self {
        let index = matrix
            .variable_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        Self { matrix, index }
    }

    fn contains(&self, variable: &str) -> bool {
        self.index.contains_key(variable)
    }

    /// Rounded value; zero for variables outside the matrix.
    fn value(&self, variable: &str, function: usize) -> f64 {
        self.index
            .get(variable)
            .map(|&v| round_sensitivity(self.matrix.values[v][function]))
            .unwrap_or(0.0)
    }
}

/// Fold a generator matrix of one case into `table`.
pub fn fold_generator_matrix(
    matrix: &SensitivityMatrix,
    case_id: &str,
    layout: &LeverLayout,
    table: &mut SensitivityTable,
) {
    let rows = Rows::new(matrix);
    for (f, function) in matrix.function_ids.iter().enumerate() {
        let mut levers: Vec<(String, f64)> = layout
            .individual_generators()
            .filter(|g| rows.contains(g))
            .map(|g| (g.clone(), rows.value(g, f)))
            .collect();
        for (lever, terminals) in &layout.hvdc_levers {
            let value = rows.value(&terminals.end, f) - rows.value(&terminals.origin, f);
            levers.push((lever.clone(), round_sensitivity(value)));
        }
        let pooled: f64 = layout
            .counter_trading
            .iter()
            .map(|(g, key)| key * rows.value(g, f))
            .sum();
        levers.push((COUNTER_TRADING_KEY.to_string(), round_sensitivity(pooled)));
        table.merge_case(function, case_id, levers);
    }
}

/// Fold a PST matrix of one case into `table`.
pub fn fold_pst_matrix(matrix: &SensitivityMatrix, case_id: &str, table: &mut SensitivityTable) {
    for (f, function) in matrix.function_ids.iter().enumerate() {
        let levers = matrix
            .variable_ids
            .iter()
            .zip(&matrix.values)
            .map(|(pst, row)| (pst.clone(), round_sensitivity(row[f])));
        table.merge_case(function, case_id, levers);
    }
}

/// Record the base value of every function of `matrix` under [`REFERENCE_KEY`].
///
/// Reference flows are kept as solved; only a missing (non-finite) value becomes 0.
pub fn reference_values(matrix: &SensitivityMatrix, case_id: &str, table: &mut SensitivityTable) {
    for (function, value) in matrix.function_ids.iter().zip(&matrix.reference_values) {
        let value = if value.is_finite() { *value } else { 0.0 };
        table.set(function, case_id, REFERENCE_KEY, value);
    }
}

/// Accumulates solved cases into the branch and HVDC tables.
#[derive(Debug, Clone, Default)]
pub struct SensitivityResultAssembler {
    layout: LeverLayout,
    branch: SensitivityTable,
    hvdc: SensitivityTable,
}

impl SensitivityResultAssembler {
    pub fn new(layout: LeverLayout) -> Self {
        Self {
            layout,
            ..Default::default()
        }
    }

    pub fn layout(&self) -> &LeverLayout {
        &self.layout
    }

    pub fn assemble(&mut self, case_id: &str, result: &SensitivityResult) {
        let Self {
            layout,
            branch,
            hvdc,
        } = self;
        for (generators_matrix, psts_matrix, table) in [
            (GENERATORS_MATRIX, PSTS_MATRIX, branch),
            (GENERATORS_EQ_LINE_MATRIX, PSTS_EQ_LINE_MATRIX, hvdc),
        ] {
            let generators = result.matrices.get(generators_matrix);
            if let Some(matrix) = generators {
                fold_generator_matrix(matrix, case_id, layout, table);
                reference_values(matrix, case_id, table);
            }
            if let Some(matrix) = result.matrices.get(psts_matrix) {
                fold_pst_matrix(matrix, case_id, table);
                if generators.is_none() {
                    reference_values(matrix, case_id, table);
                    for function in &matrix.function_ids {
                        table.set(function, case_id, COUNTER_TRADING_KEY, 0.0);
                    }
                }
            }
        }
    }

    /// Branch table and HVDC table, the latter keyed by HVDC line id.
    pub fn finish(self) -> Sensitivities {
        Sensitivities {
            branch: self.branch,
            hvdc: self.hvdc.rename_functions(|line| {
                line.strip_prefix(EQUIVALENT_LINE_PREFIX)
                    .unwrap_or(line)
                    .to_string()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(variables: &[&str], values: Vec<Vec<f64>>) -> SensitivityMatrix {
        SensitivityMatrix {
            function_ids: vec!["L1".into(), "L2".into()],
            variable_ids: variables.iter().map(|s| s.to_string()).collect(),
            values,
            reference_values: vec![120.0, f64::NAN],
        }
    }

    fn layout() -> LeverLayout {
        LeverLayout {
            generators: vec!["G1".into(), "CT_A".into(), "ORIGIN".into()],
            hvdc_levers: BTreeMap::from([(
                "H1".to_string(),
                TerminalGenerators {
                    origin: "ORIGIN".into(),
                    end: "END".into(),
                },
            )]),
            counter_trading: BTreeMap::from([("CT_A".to_string(), 1.0), ("CT_B".to_string(), -1.0)]),
            psts: vec!["P1".into()],
        }
    }

    #[test]
    fn test_generator_variables_are_unique() {
        assert_eq!(
            layout().generator_variables(),
            vec!["CT_A", "CT_B", "END", "G1", "ORIGIN"]
        );
    }

    #[test]
    fn test_generator_fold() {
        let m = matrix(
            &["CT_A", "CT_B", "END", "G1", "ORIGIN"],
            vec![
                vec![0.3, 0.0],
                vec![-0.1, 0.0],
                vec![0.25, f64::NAN],
                vec![0.123_456_7, 1.0],
                vec![-0.5, 0.2],
            ],
        );
        let mut table = SensitivityTable::new();
        fold_generator_matrix(&m, "N", &layout(), &mut table);
        reference_values(&m, "N", &mut table);

        let levers = table.levers("L1", "N").unwrap();
        let names: Vec<&str> = levers.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["G1", "H1", "counter_trading", "referenceCurrent"]);
        assert_eq!(levers["G1"], 0.123457);
        assert_eq!(levers["H1"], 0.75);
        assert_eq!(levers["counter_trading"], 0.4);
        assert_eq!(levers["referenceCurrent"], 120.0);

        // NaN end row counts as zero
        assert_eq!(table.get("L2", "N", "H1"), -0.2);
        assert_eq!(table.get("L2", "N", REFERENCE_KEY), 0.0);
    }

    #[test]
    fn test_reference_values_are_not_rounded() {
        let mut m = matrix(&["G1"], vec![vec![0.0, 0.0]]);
        m.reference_values = vec![4e-7, 12.345_678_9];
        let mut table = SensitivityTable::new();
        reference_values(&m, "N", &mut table);
        assert_eq!(table.get("L1", "N", REFERENCE_KEY), 4e-7);
        assert_eq!(table.get("L2", "N", REFERENCE_KEY), 12.345_678_9);
    }

    #[test]
    fn test_assembler_keys_hvdc_table_by_line() {
        let mut result = SensitivityResult::default();
        let pst = SensitivityMatrix {
            function_ids: vec!["ac_eq_line_H1".into()],
            variable_ids: vec!["P1".into()],
            values: vec![vec![-35.5]],
            reference_values: vec![150.0],
        };
        result.matrices.insert(PSTS_EQ_LINE_MATRIX.into(), pst);

        let mut assembler = SensitivityResultAssembler::new(layout());
        assembler.assemble("N", &result);
        let sensitivities = assembler.finish();
        assert!(sensitivities.branch.is_empty());
        assert_eq!(sensitivities.hvdc.get("H1", "N", "P1"), -35.5);
        assert_eq!(sensitivities.hvdc.get("H1", "N", REFERENCE_KEY), 150.0);
        assert!(sensitivities
            .hvdc
            .levers("H1", "N")
            .unwrap()
            .contains_key(COUNTER_TRADING_KEY));
    }
}
