pub mod sensitivities;
