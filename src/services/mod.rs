// Darkelf Shell services
// Services supervise external collaborators: settings file, Tor, proxy binding, panic wipe.

pub mod panic_handler;
pub mod periodic_task;
pub mod proxy;
pub mod settings_engine;
pub mod tor_controller;
