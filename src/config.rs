//! Engine configuration

/// Knobs for a query engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Schema name stamped on output column descriptors.
    pub schema_name: String,

    /// Whether join preparation may build secondary indexes on declared
    /// indexable join columns. Disabling forces full-scan inner joins; the
    /// results are identical either way.
    pub build_join_indexes: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema_name: "live".to_string(),
            build_join_indexes: true,
        }
    }
}

impl EngineConfig {
    /// Config used by the test suites.
    pub fn for_testing() -> Self {
        Self::default()
    }
}
