// Image retrieval: fetch a submission's linked image and make sure it is one.

pub mod download;
