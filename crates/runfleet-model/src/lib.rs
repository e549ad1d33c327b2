mod domain;
pub use domain::{
    ARCH_LABEL_UNKNOWN, Env, KeyValue, LABEL_CONTAINER, LABEL_JOB_RUN, LABEL_MANAGED,
    LABEL_REPOSITORY, LabelSet, Labels, SELF_HOSTED, process_arch_label,
};

mod error;
pub use error::{ModelError, ModelResult};

mod event;
pub use event::{JobContext, JobEvent, Repository, WorkflowJob, encode_content};

mod filter;
pub use filter::{FilterPolicy, ListRule};

mod runner;
pub use runner::{RunnerInstance, RunnerStatus};
