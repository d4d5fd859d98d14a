//! Row structs.
//!
//! Every domain table shares one physical layout, so a single
//! [`grouped_row::GroupedRow`] serves all of them.

pub mod grouped_row;
