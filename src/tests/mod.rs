mod queries;
mod serialization;
mod util;
