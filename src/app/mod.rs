//! Application orchestration module

pub mod initialization;
pub mod execution;

pub use initialization::{
    load_configuration,
    configure_logging,
    build_queue_config,
};
pub use execution::{
    render_report,
    run_simulation,
    SimulationReport,
};
