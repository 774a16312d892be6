use youfirst_core::sync::local_user_id;
use youfirst_core::{Summary, SystemClock};

use super::{open, print_json, CmdResult};

pub fn run() -> CmdResult {
    let (store, config) = open()?;
    let user_id = local_user_id(&store, &config.profile);
    print_json(&Summary::collect(&store, &SystemClock, &user_id))
}
