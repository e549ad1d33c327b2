mod kv;
pub use kv::KeyValue;

mod env;
pub use env::Env;

mod labels;
pub use labels::Labels;

mod label_set;
pub use label_set::{ARCH_LABEL_UNKNOWN, LabelSet, SELF_HOSTED, process_arch_label};

mod constants;
pub use constants::{LABEL_CONTAINER, LABEL_JOB_RUN, LABEL_MANAGED, LABEL_REPOSITORY};
