pub(crate) mod async_task;

#[cfg(test)]
mod utils_test;
