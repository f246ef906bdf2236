mod row;

pub use row::RowMapping;
