use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::{Student, renumber};
use crate::error::{ModelError, Result};
use crate::numeric::lenient_f64;

/// The fixed set of sponsorship programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum ProgramCode {
    /// Children's Home
    #[serde(rename = "CH")]
    Ch,
    /// Youth Sponsorship Program
    #[serde(rename = "YSP")]
    Ysp,
}

impl ProgramCode {
    pub const ALL: [ProgramCode; 2] = [ProgramCode::Ch, ProgramCode::Ysp];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramCode::Ch => "CH",
            ProgramCode::Ysp => "YSP",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProgramCode::Ch => "Children's Home",
            ProgramCode::Ysp => "Youth Sponsorship Program",
        }
    }
}

impl fmt::Display for ProgramCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgramCode {
    type Err = ModelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CH" => Ok(ProgramCode::Ch),
            "YSP" => Ok(ProgramCode::Ysp),
            _ => Err(ModelError::UnknownProgram(s.to_string())),
        }
    }
}

/// Derived figures of a program, rebuilt by every recalculation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProgramMetadata {
    #[serde(default)]
    pub total_students: usize,
    /// Number of students per sponsorship package label
    #[serde(default)]
    pub sponsorship_types: BTreeMap<String, usize>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub monthly_costs_ugx: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub monthly_costs_eur: f64,
}

/// A sponsorship cohort and its ordered list of students.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Program {
    pub code: ProgramCode,
    pub name: String,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub metadata: ProgramMetadata,
}

impl Program {
    pub fn new(code: ProgramCode) -> Self {
        Self {
            code,
            name: code.display_name().to_string(),
            students: Vec::new(),
            metadata: ProgramMetadata::default(),
        }
    }

    pub fn has_student(&self, full_name: &str) -> bool {
        self.students.iter().any(|s| s.full_name == full_name)
    }

    pub fn student(&self, serial: u32) -> Result<&Student> {
        self.students
            .iter()
            .find(|s| s.serial_number == serial)
            .ok_or(ModelError::StudentNotFound { program: self.code, serial })
    }

    pub fn student_mut(&mut self, serial: u32) -> Result<&mut Student> {
        let program = self.code;
        self.students
            .iter_mut()
            .find(|s| s.serial_number == serial)
            .ok_or(ModelError::StudentNotFound { program, serial })
    }

    /// Appends a student with the next serial number and returns that number.
    pub fn push_student(&mut self, mut student: Student) -> u32 {
        let serial = self.students.len() as u32 + 1;
        student.serial_number = serial;
        self.students.push(student);
        serial
    }

    /// Removes a student and renumbers the rest in their original order.
    pub fn remove_student(&mut self, serial: u32) -> Result<Student> {
        let index = self
            .students
            .iter()
            .position(|s| s.serial_number == serial)
            .ok_or(ModelError::StudentNotFound { program: self.code, serial })?;
        let removed = self.students.remove(index);
        renumber(&mut self.students);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Student {
        Student {
            full_name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_program_code_parsing() {
        assert_eq!("ch".parse::<ProgramCode>().unwrap(), ProgramCode::Ch);
        assert_eq!(" YSP ".parse::<ProgramCode>().unwrap(), ProgramCode::Ysp);
        assert_eq!(
            "XX".parse::<ProgramCode>(),
            Err(ModelError::UnknownProgram("XX".to_string()))
        );
    }

    #[test]
    fn test_program_code_serializes_as_code() {
        assert_eq!(serde_json::to_string(&ProgramCode::Ysp).unwrap(), "\"YSP\"");
    }

    #[test]
    fn test_push_assigns_dense_serials() {
        let mut program = Program::new(ProgramCode::Ch);
        assert_eq!(program.push_student(named("A")), 1);
        assert_eq!(program.push_student(named("B")), 2);
        assert!(program.has_student("B"));
        assert_eq!(program.student(2).unwrap().full_name, "B");
    }

    #[test]
    fn test_remove_renumbers_remaining() {
        let mut program = Program::new(ProgramCode::Ch);
        for name in ["A", "B", "C", "D"] {
            program.push_student(named(name));
        }

        let removed = program.remove_student(2).unwrap();
        assert_eq!(removed.full_name, "B");

        let serials: Vec<(u32, &str)> = program
            .students
            .iter()
            .map(|s| (s.serial_number, s.full_name.as_str()))
            .collect();
        assert_eq!(serials, vec![(1, "A"), (2, "C"), (3, "D")]);
    }

    #[test]
    fn test_remove_missing_student() {
        let mut program = Program::new(ProgramCode::Ysp);
        assert_eq!(
            program.remove_student(1),
            Err(ModelError::StudentNotFound { program: ProgramCode::Ysp, serial: 1 })
        );
    }
}
