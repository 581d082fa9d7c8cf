pub mod assignment;
pub mod entities;
pub mod ids;
pub mod job;
pub mod problem_instance;
pub mod time_config;
pub mod variant;

pub use assignment::{Assignment, Slot};
pub use entities::{Course, Faculty, Room, Student, TimeSlot};
pub use ids::{CourseId, DepartmentId, FacultyId, JobId, OrgId, RoomId, StudentId, TimeSlotId};
pub use job::{GenerationJob, JobStatus, Stage};
pub use problem_instance::{CourseKey, ProblemInstance};
pub use time_config::TimeConfig;
pub use variant::{ObjectiveWeights, Variant};
