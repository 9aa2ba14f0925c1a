pub mod commit_service;
pub mod conflict_detector;
pub mod resolution_service;
pub mod rule_parser;
pub mod rule_store;
pub mod schedule_generator;
pub mod schedule_utils;
