pub mod csv_writer;
pub mod stl_writer;
pub mod vtk_writer;
