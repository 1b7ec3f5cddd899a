//! Concrete 0D elements.

pub mod chamber;
pub mod closed_loop_rcr;
pub mod coronary;
pub mod flow_bc;
pub mod heart_pulmonary;
pub mod junction;
pub mod pressure_bc;
pub mod resistance_bc;
pub mod resistive_junction;
pub mod valve;
pub mod vessel;
pub mod vessel_junction;
pub mod windkessel;

pub use chamber::ChamberElastanceInductor;
pub use closed_loop_rcr::ClosedLoopRcrBc;
pub use coronary::OpenLoopCoronaryBc;
pub use flow_bc::FlowReferenceBc;
pub use heart_pulmonary::ClosedLoopHeartPulmonary;
pub use junction::Junction;
pub use pressure_bc::PressureReferenceBc;
pub use resistance_bc::ResistanceBc;
pub use resistive_junction::ResistiveJunction;
pub use valve::ValveTanh;
pub use vessel::BloodVessel;
pub use vessel_junction::{BloodVesselJunction, BranchParams};
pub use windkessel::WindkesselBc;
