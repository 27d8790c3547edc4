mod solver_properties;
mod solver_failures;
