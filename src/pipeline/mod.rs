// The two bot stages. Each runs to completion and talks to the other only
// through the image directory and the persisted lists.

pub mod fetch;
pub mod quarantine;
