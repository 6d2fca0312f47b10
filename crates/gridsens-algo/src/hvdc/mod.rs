//! HVDC preparation: AC-emulation equivalents and setpoint levers.

pub mod emulation;
pub mod levers;

pub use emulation::{
    build_equivalent_lines, equivalent_line_id, equivalent_reactance, force_setpoint,
    resolve_attachment, Attachment, EQUIVALENT_LINE_PREFIX,
};
pub use levers::{
    add_terminal_generators, fictitious_generator_id, infer_lever_groups, merge_parallel_levers,
    LeverBounds, LeverGroup, TerminalGenerators,
};
