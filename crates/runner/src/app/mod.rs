pub(crate) mod bootstrap;
pub(crate) mod headless;
pub(crate) mod loop_runner;
pub(crate) mod program_file;
