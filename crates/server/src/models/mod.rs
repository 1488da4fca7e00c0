pub mod academics;
pub mod announcements;
pub mod attendance;
pub mod exams;
pub mod hostel;
pub mod lostfound;
pub mod marks;
pub mod materials;
pub mod portal;
pub mod transport;
pub mod users;
