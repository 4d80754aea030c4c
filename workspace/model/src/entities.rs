//! Root of the entity modules.
//!
//! The whole organization is one [`Dataset`] aggregate: programs with their
//! students, one sponsor registry per program, expenses, events and the
//! database-wide metadata. Nothing outlives the dataset it belongs to.

pub mod dataset;
pub mod event;
pub mod expense;
pub mod program;
pub mod registry;
pub mod student;

pub use dataset::{
    DatabaseMetadata, Dataset, ImportKind, MergeStrategy, ProgramSummary, SourceFileRecord,
};
pub use event::Event;
pub use expense::Expense;
pub use program::{Program, ProgramCode, ProgramMetadata};
pub use registry::{Registry, RegistryMetadata, Sponsor, SponsorStatus};
pub use student::{FinancialData, Student};

/// Entities identified by a dense 1-based position (serial numbers, CIDs).
pub trait Numbered {
    fn number(&self) -> u32;
    fn set_number(&mut self, number: u32);
}

/// Reassigns `1..=N` to `items` in their current order.
pub fn renumber<T: Numbered>(items: &mut [T]) {
    for (index, item) in items.iter_mut().enumerate() {
        item.set_number(index as u32 + 1);
    }
}

/// Next free identifier for collections whose ids are never reused positions.
pub(crate) fn next_id(ids: impl Iterator<Item = u32>) -> u32 {
    ids.max().unwrap_or(0) + 1
}

#[cfg(test)]
mod test {
    use super::*;

    fn student(serial: u32, name: &str) -> Student {
        Student {
            serial_number: serial,
            full_name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_renumber_keeps_order() {
        let mut students = vec![student(4, "A"), student(9, "B"), student(2, "C")];
        renumber(&mut students);

        let numbers: Vec<u32> = students.iter().map(|s| s.serial_number).collect();
        let names: Vec<&str> = students.iter().map(|s| s.full_name.as_str()).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_next_id() {
        assert_eq!(next_id(std::iter::empty()), 1);
        assert_eq!(next_id([3, 1, 7].into_iter()), 8);
    }
}
