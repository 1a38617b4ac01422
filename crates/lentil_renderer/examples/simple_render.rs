//! Simple Whitted ray tracer example.
//!
//! Renders a small scene with every primitive, a mirror and a glass sphere,
//! and saves it as PNG. Pass a lens prescription file to render through it:
//!
//! ```text
//! cargo run --example simple_render -- lenses/dgauss.50mm.dat
//! ```

use anyhow::Context;
use lentil_core::{
    load_lens_file, Attenuation, CameraDesc, GlobalCoefficients, Light, Material, PrimitiveKind,
    SceneDescription, ShapeDesc,
};
use lentil_math::{Mat4, Quat, Vec3};
use lentil_renderer::{render_image, Color, RenderConfig};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 360;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut scene = build_scene();
    let mut config = RenderConfig::default();

    if let Some(path) = std::env::args().nth(1) {
        scene.lens = load_lens_file(&path).with_context(|| format!("loading lens {}", path))?;
        config.lens = true;
    }

    println!(
        "Rendering {}x{} with {} shapes and {} lights...",
        scene.width,
        scene.height,
        scene.shapes.len(),
        scene.lights.len()
    );

    let start = std::time::Instant::now();
    let pixels = render_image(&scene, &config)?;
    println!("Rendered in {:?}", start.elapsed());

    let filename = "output.png";
    image::save_buffer(filename, &pixels, scene.width, scene.height, image::ColorType::Rgba8)
        .with_context(|| format!("writing {}", filename))?;
    println!("Saved to {}", filename);

    Ok(())
}

fn placed(kind: PrimitiveKind, position: Vec3, scale: Vec3, material: Material) -> ShapeDesc {
    ShapeDesc::new(
        kind,
        Mat4::from_scale_rotation_translation(scale, Quat::IDENTITY, position),
        material,
    )
}

fn build_scene() -> SceneDescription {
    let camera = CameraDesc::looking_at(Vec3::new(0.0, 1.5, 6.0), Vec3::new(0.0, 0.5, 0.0), Vec3::Y);
    let mut scene = SceneDescription::new(WIDTH, HEIGHT, camera);
    scene.globals = GlobalCoefficients {
        ka: 0.3,
        kd: 0.8,
        ks: 0.6,
        kt: 0.9,
        velocity_scale: 1.0,
    };

    // Ground slab
    scene.add_shape(placed(
        PrimitiveKind::Cube,
        Vec3::new(0.0, -0.55, 0.0),
        Vec3::new(12.0, 0.1, 12.0),
        Material {
            ambient: Color::splat(0.2),
            diffuse: Color::splat(0.6),
            reflective: Color::splat(0.2),
            ..Default::default()
        },
    ));

    let plastic = |diffuse: Color| Material {
        ambient: diffuse * 0.2,
        diffuse,
        specular: Color::ONE,
        shininess: 25.0,
        ..Default::default()
    };

    scene.add_shape(placed(
        PrimitiveKind::Cube,
        Vec3::new(-2.2, 0.0, -0.5),
        Vec3::ONE,
        plastic(Color::new(0.8, 0.2, 0.2)),
    ));
    scene.add_shape(placed(
        PrimitiveKind::Cone,
        Vec3::new(-0.8, 0.25, 0.5),
        Vec3::new(1.0, 1.5, 1.0),
        plastic(Color::new(0.2, 0.7, 0.3)),
    ));
    scene.add_shape(placed(
        PrimitiveKind::Cylinder,
        Vec3::new(2.2, 0.25, -0.5),
        Vec3::new(1.0, 1.5, 1.0),
        plastic(Color::new(0.2, 0.3, 0.8)),
    ));

    // Mirror ball and glass ball
    scene.add_shape(placed(
        PrimitiveKind::Sphere,
        Vec3::new(0.6, 0.5, -1.5),
        Vec3::splat(2.0),
        Material {
            diffuse: Color::splat(0.05),
            specular: Color::ONE,
            reflective: Color::splat(0.9),
            shininess: 60.0,
            ..Default::default()
        },
    ));
    scene.add_shape(placed(
        PrimitiveKind::Sphere,
        Vec3::new(0.9, 0.0, 1.2),
        Vec3::ONE,
        Material {
            diffuse: Color::splat(0.05),
            specular: Color::ONE,
            transparent: Color::splat(0.9),
            shininess: 80.0,
            ior: 1.5,
            ..Default::default()
        },
    ));

    scene.add_light(Light::Point {
        position: Vec3::new(-3.0, 5.0, 4.0),
        color: Color::splat(0.8),
        attenuation: Attenuation::new(1.0, 0.02, 0.0),
    });
    scene.add_light(Light::Directional {
        direction: Vec3::new(1.0, -1.0, -0.5),
        color: Color::splat(0.3),
    });
    scene.add_light(Light::Area {
        position: Vec3::new(2.0, 4.0, 2.0),
        direction: Vec3::new(-0.5, -1.0, -0.5),
        color: Color::splat(0.3),
        attenuation: Attenuation::default(),
        width: 1.0,
        height: 1.0,
    });

    scene
}
