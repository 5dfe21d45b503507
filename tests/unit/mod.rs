mod config_tests;
mod pipeline_tests;
mod property_tests;
