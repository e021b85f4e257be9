// Purpose: reed physics, the shared bellows, and voice management
// This layer sits below the engine and never touches a ring buffer itself

pub mod bellows;
pub mod integrator;
pub mod message;
pub mod poly;
pub mod voice;
