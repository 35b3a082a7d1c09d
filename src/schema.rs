//! # Timer File Schema
//!
//! The benchmarking framework writes one CSV row per simulation trial. This
//! module names every column the analysis understands and records, for each
//! one, whether a file without it can still be analysed and how repeated
//! trials of the same configuration are collapsed into one row.
//!
//! The schema is checked once, when a file is loaded. Later stages look
//! columns up by name and treat absence as "skip what depends on it".

/// Group key: number of compute nodes
pub const NUM_NODES: &str = "num_nodes";
/// Group key: threads per MPI task
pub const THREADS_PER_TASK: &str = "threads_per_task";
/// Group key: MPI tasks per node
pub const TASKS_PER_NODE: &str = "tasks_per_node";
/// Group key: simulated model time
pub const MODEL_TIME_SIM: &str = "model_time_sim";
/// Identifies a trial, never a configuration
pub const RNG_SEED: &str = "rng_seed";

pub const TIME_CONSTRUCTION_CREATE: &str = "time_construction_create";
pub const TIME_CONSTRUCTION_CONNECT: &str = "time_construction_connect";
pub const TIME_SIMULATE: &str = "time_simulate";
pub const PY_TIME_CREATE: &str = "py_time_create";
pub const PY_TIME_CONNECT: &str = "py_time_connect";

pub const LOCAL_SPIKE_COUNTER: &str = "local_spike_counter";
pub const NETWORK_SIZE: &str = "network_size";
pub const N_EX: &str = "N_ex";
pub const N_IN: &str = "N_in";
pub const N_ASTRO: &str = "N_astro";

/// Suffix of the standard-deviation companion of a mean column
pub const STD_SUFFIX: &str = "_std";

/// The columns that identify one experimental configuration, in sort order
pub const KEY_COLUMNS: [&str; 4] = [NUM_NODES, THREADS_PER_TASK, TASKS_PER_NODE, MODEL_TIME_SIM];

/// Sub-phase timers that only some simulator builds report
pub const DETAILED_TIMERS: [&str; 16] = [
    "time_collocate_spike_data",
    "time_communicate_spike_data",
    "time_deliver_spike_data",
    "time_update",
    "time_deliver_secondary_data",
    "time_gather_secondary_data",
    "time_communicate_target_data",
    "time_gather_spike_data",
    "time_gather_target_data",
    "time_communicate_prepare",
    "time_construction_connect_third_inner_count",
    "time_construction_connect_third_inner_max",
    "time_construction_connect_third_inner_fill",
    "time_construction_connect_third_inner_communicate",
    "time_construction_connect_third_inner_connect",
    "time_synchronize",
];

/// How the values of one column are collapsed across the trials of a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Part of the configuration key
    Key,
    /// Mean, plus a `_std` companion column with the sample standard deviation
    MeanStd,
    /// Static descriptor: first present value taken verbatim
    First,
    /// Read for validation, then dropped before grouping
    Drop,
}

/// One column the analysis knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub aggregation: Aggregation,
    pub required: bool,
}

impl ColumnSpec {
    const fn required(name: &'static str, aggregation: Aggregation) -> Self {
        Self {
            name,
            aggregation,
            required: true,
        }
    }

    const fn optional(name: &'static str, aggregation: Aggregation) -> Self {
        Self {
            name,
            aggregation,
            required: false,
        }
    }
}

/// The full set of columns understood by the loader
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Default for Schema {
    fn default() -> Self {
        let mut columns = vec![
            ColumnSpec::required(NUM_NODES, Aggregation::Key),
            ColumnSpec::required(THREADS_PER_TASK, Aggregation::Key),
            ColumnSpec::required(TASKS_PER_NODE, Aggregation::Key),
            ColumnSpec::required(MODEL_TIME_SIM, Aggregation::Key),
            ColumnSpec::required(RNG_SEED, Aggregation::Drop),
            ColumnSpec::required(TIME_CONSTRUCTION_CREATE, Aggregation::MeanStd),
            ColumnSpec::required(TIME_CONSTRUCTION_CONNECT, Aggregation::MeanStd),
            ColumnSpec::required(TIME_SIMULATE, Aggregation::MeanStd),
            ColumnSpec::optional(PY_TIME_CREATE, Aggregation::MeanStd),
            ColumnSpec::optional(PY_TIME_CONNECT, Aggregation::MeanStd),
            ColumnSpec::optional(NETWORK_SIZE, Aggregation::First),
            ColumnSpec::optional(N_EX, Aggregation::First),
            ColumnSpec::optional(N_IN, Aggregation::First),
            ColumnSpec::optional(N_ASTRO, Aggregation::First),
            ColumnSpec::optional("num_connections", Aggregation::MeanStd),
            ColumnSpec::optional(LOCAL_SPIKE_COUNTER, Aggregation::MeanStd),
            ColumnSpec::optional("tsodyks_synapse", Aggregation::MeanStd),
            ColumnSpec::optional("sic_connection", Aggregation::MeanStd),
        ];
        columns.extend(
            DETAILED_TIMERS
                .iter()
                .map(|&name| ColumnSpec::optional(name, Aggregation::MeanStd)),
        );
        Self { columns }
    }
}

impl Schema {
    /// All known columns, in output order
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns that must be present in every timer file
    pub fn required(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.required)
    }

    /// Report the first required column missing from `header`, if any
    pub fn check_header(&self, header: &[String]) -> Result<(), &'static str> {
        match self
            .required()
            .find(|spec| !header.iter().any(|h| h == spec.name))
        {
            Some(spec) => Err(spec.name),
            None => Ok(()),
        }
    }
}

/// Name of the standard-deviation companion of `column`
pub fn std_name(column: &str) -> String {
    format!("{}{}", column, STD_SUFFIX)
}
