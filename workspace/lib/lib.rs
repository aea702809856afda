#![allow(non_snake_case)]

//! Shared pieces of the driver programs: run configuration and output
//! helpers.

pub mod config;

/// Create a directory and all its parents, if they don't already exist.
#[macro_export]
macro_rules! mkdir {
    ( $dir:expr ) => {
        std::fs::create_dir_all(&$dir)?
    };
}

/// Write a set of named arrays to a `.npz` file.
///
/// ```ignore
/// write_npz!(
///     outdir.join("data.npz"),
///     arrays: {
///         "time" => &time,
///         "rho" => &rho,
///     }
/// );
/// ```
#[macro_export]
macro_rules! write_npz {
    ( $path:expr, arrays: { $( $name:expr => $arr:expr ),* $(,)? } ) => {
        {
            let mut npz = ndarray_npy::NpzWriter::new(std::fs::File::create($path)?);
            $(
                npz.add_array($name, $arr)?;
            )*
            npz.finish()?;
        }
    };
}
