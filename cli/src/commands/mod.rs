mod helpers;
mod progress;
mod reflections;

pub(crate) use progress::{
    cmd_favorite, cmd_favorites, cmd_reset, cmd_restart, cmd_set_day, cmd_set_start, cmd_start,
    cmd_status,
};
pub(crate) use reflections::{cmd_prayers, cmd_read, cmd_week};
