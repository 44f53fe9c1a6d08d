//! Infrastructure layer for experiment A/B testing
//!
//! In-memory stores, consistent variant assignment and the statistical comparator.

mod consistent_hashing;
mod in_memory_assignment_store;
mod in_memory_repository;
mod statistical;

pub use consistent_hashing::ConsistentHasher;
pub use in_memory_assignment_store::InMemoryAssignmentStore;
pub use in_memory_repository::InMemoryExperimentRepository;
pub use statistical::{
    mean, student_t_test, student_t_two_sided_p, variance, ComparatorConfig,
    StatisticalComparator, DEFAULT_SIGNIFICANCE_LEVEL, DEFAULT_TIE_TOLERANCE,
};
