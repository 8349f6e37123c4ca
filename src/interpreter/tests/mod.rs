//! Interpreter tests, organized by feature area

mod helpers;

mod builtin_tests;
mod function_tests;
mod generator_mode_tests;
mod statement_tests;
