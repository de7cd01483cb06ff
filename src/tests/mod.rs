// Crate-level scenario and property tests, mirroring the literal examples
// and universal invariants that drove the analyzer suite's design.

mod invariants;
mod scenarios;
