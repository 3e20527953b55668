pub(crate) mod bit_array;
pub(crate) mod spin_lock;
