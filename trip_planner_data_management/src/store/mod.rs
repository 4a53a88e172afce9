pub mod item_repository;
mod locks;
pub mod trip_store;

#[cfg(test)]
pub(crate) mod test_support;
