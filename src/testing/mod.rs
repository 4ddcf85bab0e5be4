//! Test containers: the files written after a test build, the index that
//! tracks them, and running the tests they hold.

pub mod container;
pub mod index;
pub mod runner;

pub use container::{TestContainer, TestExecutable};
pub use index::{ContainerChange, ContainersListener, TestContainerIndex};
pub use runner::{discover_tests, run_tests, TestCase, TestOutcome, TestResult};
