pub mod abaqus_inp;
pub mod result_csv;
