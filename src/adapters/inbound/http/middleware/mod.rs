mod principal;

pub use principal::CurrentUser;
