//! PLY (Stanford polygon) export of grid meshes.
//!
//! Vertices are written in grid units together with their unit normals
//! (`nx ny nz`), faces as `vertex_indices` lists.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;
use ply_rs::ply::{
    Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
    ScalarType,
};
use ply_rs::writer::Writer;

use crate::error::{DenoiseError, Result};
use crate::mesh::GridMesh;

/// Save a mesh to an ASCII PLY file.
///
/// # Example
///
/// ```no_run
/// use terrace::grid::Grid;
/// use terrace::io::ply;
/// use terrace::mesh::GridMesh;
///
/// let grid = Grid::filled(3, 3, 1.0, 0.0).unwrap();
/// ply::save(&GridMesh::build(&grid), "surface.ply").unwrap();
/// ```
pub fn save<P: AsRef<Path>>(mesh: &GridMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    write(mesh, &mut writer).map_err(|e| DenoiseError::SaveError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    writer.flush()?;

    debug!(
        "saved {} vertices and {} faces to {}",
        mesh.mesh().num_vertices(),
        mesh.mesh().num_faces(),
        path.display()
    );
    Ok(())
}

/// Write `mesh` as ASCII PLY.
pub fn write<W: Write>(mesh: &GridMesh, writer: &mut W) -> std::io::Result<usize> {
    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;
    ply.header
        .comments
        .push("terrace height field mesh".to_string());

    let mut vertex_def = ElementDef::new("vertex".to_string());
    for name in ["x", "y", "z", "nx", "ny", "nz"] {
        vertex_def.properties.add(PropertyDef::new(
            name.to_string(),
            PropertyType::Scalar(ScalarType::Double),
        ));
    }
    ply.header.elements.add(vertex_def);

    let mut face_def = ElementDef::new("face".to_string());
    face_def.properties.add(PropertyDef::new(
        "vertex_indices".to_string(),
        PropertyType::List(ScalarType::UChar, ScalarType::Int),
    ));
    ply.header.elements.add(face_def);

    let vertices = mesh
        .mesh()
        .vertex_ids()
        .map(|v| {
            let p = mesh.world_position(v);
            let n = mesh.normals().vertex(v);
            let mut element = DefaultElement::new();
            for (name, value) in [
                ("x", p.x),
                ("y", p.y),
                ("z", p.z),
                ("nx", n.x),
                ("ny", n.y),
                ("nz", n.z),
            ] {
                element.insert(name.to_string(), Property::Double(value));
            }
            element
        })
        .collect();
    ply.payload.insert("vertex".to_string(), vertices);

    let faces = mesh
        .mesh()
        .faces()
        .iter()
        .map(|f| {
            let mut element = DefaultElement::new();
            element.insert(
                "vertex_indices".to_string(),
                Property::ListInt(f.iter().map(|v| v.raw() as i32).collect()),
            );
            element
        })
        .collect();
    ply.payload.insert("face".to_string(), faces);

    ply.make_consistent().map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("PLY consistency error: {:?}", e),
        )
    })?;

    Writer::new().write_ply(writer, &mut ply)
}
