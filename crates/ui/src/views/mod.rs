mod admin;
mod home;
mod live;

#[cfg(test)]
mod test_harness;
#[cfg(test)]
mod view_smoke;

pub use admin::AdminView;
pub use home::HomeView;
pub use live::use_live_progress;
