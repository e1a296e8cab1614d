//! Integration tests for world transform propagation.
//!
//! # Usage
//!
//! ```sh
//! cargo test --test propagation_integration
//! ```

use std::f32::consts::FRAC_PI_2;

use bevy_ecs::prelude::*;
use glam::{Affine2, Vec2};

use aberredhierarchy::components::localtransform2d::LocalTransform2D;
use aberredhierarchy::components::parent::ParentRef;
use aberredhierarchy::components::posttransform2d::PostTransformMatrix2D;
use aberredhierarchy::components::worldtransform2d::WorldTransform2D;
use aberredhierarchy::pipeline::HierarchyPipeline;
use aberredhierarchy::resources::hierarchyconfig::HierarchyConfig;
use aberredhierarchy::resources::hierarchystats::HierarchyStats;

const EPSILON: f32 = 1e-4;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn world_of(world: &World, e: Entity) -> WorldTransform2D {
    *world.get::<WorldTransform2D>(e).unwrap()
}

fn tick(world: &mut World) {
    let mut pipeline = HierarchyPipeline::new();
    pipeline.run(world);
}

// =============================================================================
// Composition
// =============================================================================

#[test]
fn root_without_children_gets_local_matrix() {
    let mut world = World::new();
    let local = LocalTransform2D::from_position_rotation_scale(
        Vec2::new(100.0, 50.0),
        0.5,
        Vec2::splat(2.0),
    );
    let root = world.spawn(local).id();

    tick(&mut world);

    assert_eq!(world_of(&world, root).0, local.to_affine());
}

#[test]
fn local_transform_inserts_identity_world_transform() {
    let mut world = World::new();
    let e = world.spawn(LocalTransform2D::from_xy(3.0, 4.0)).id();
    assert_eq!(world_of(&world, e), WorldTransform2D::IDENTITY);
}

#[test]
fn child_inherits_parent_rotation() {
    let mut world = World::new();
    let parent = world
        .spawn(LocalTransform2D::from_position_rotation(
            Vec2::new(100.0, 100.0),
            FRAC_PI_2,
        ))
        .id();
    let child = world
        .spawn((LocalTransform2D::from_xy(40.0, 0.0), ParentRef(parent)))
        .id();

    tick(&mut world);

    let wt = world_of(&world, child);
    assert!(
        approx_eq(wt.position().x, 100.0),
        "Child world X: expected 100, got {}",
        wt.position().x
    );
    assert!(
        approx_eq(wt.position().y, 140.0),
        "Child world Y: expected 140, got {}",
        wt.position().y
    );
    assert!(approx_eq(wt.rotation(), FRAC_PI_2));
}

#[test]
fn child_inherits_parent_scale() {
    let mut world = World::new();
    let parent = world
        .spawn(LocalTransform2D::from_position_rotation_scale(
            Vec2::ZERO,
            0.0,
            Vec2::new(2.0, 3.0),
        ))
        .id();
    let child = world
        .spawn((
            LocalTransform2D::from_position_rotation_scale(
                Vec2::new(10.0, 10.0),
                0.0,
                Vec2::splat(0.5),
            ),
            ParentRef(parent),
        ))
        .id();

    tick(&mut world);

    let wt = world_of(&world, child);
    assert!(approx_eq(wt.position().x, 20.0));
    assert!(approx_eq(wt.position().y, 30.0));
    assert!(approx_eq(wt.scale().x, 1.0));
    assert!(approx_eq(wt.scale().y, 1.5));
}

#[test]
fn post_matrix_applies_after_local_and_reaches_children() {
    let mut world = World::new();
    let parent = world
        .spawn((
            LocalTransform2D::from_xy(10.0, 0.0),
            PostTransformMatrix2D::from_scale(Vec2::new(2.0, 1.0)),
        ))
        .id();
    let child = world
        .spawn((LocalTransform2D::from_xy(1.0, 1.0), ParentRef(parent)))
        .id();

    tick(&mut world);

    let pw = world_of(&world, parent);
    assert_eq!(
        pw.0,
        Affine2::from_translation(Vec2::new(10.0, 0.0)) * Affine2::from_scale(Vec2::new(2.0, 1.0))
    );
    let cw = world_of(&world, child);
    assert!(approx_eq(cw.position().x, 12.0));
    assert!(approx_eq(cw.position().y, 1.0));
}

#[test]
fn post_matrix_edit_and_removal_are_dirty_triggers() {
    let mut world = World::new();
    let root = world
        .spawn((
            LocalTransform2D::IDENTITY,
            PostTransformMatrix2D::from_scale(Vec2::splat(2.0)),
        ))
        .id();
    let child = world
        .spawn((
            LocalTransform2D::from_xy(1.0, 0.0),
            PostTransformMatrix2D::from_shear_x(1.0),
            ParentRef(root),
        ))
        .id();

    let mut pipeline = HierarchyPipeline::new();
    pipeline.run(&mut world);
    assert!(approx_eq(world_of(&world, child).position().x, 2.0));

    world.get_mut::<PostTransformMatrix2D>(root).unwrap().0 = Affine2::from_scale(Vec2::splat(3.0));
    pipeline.run(&mut world);
    assert!(approx_eq(world_of(&world, child).position().x, 3.0));

    world.entity_mut(root).remove::<PostTransformMatrix2D>();
    world.entity_mut(child).remove::<PostTransformMatrix2D>();
    pipeline.run(&mut world);
    assert_eq!(world_of(&world, root), WorldTransform2D::IDENTITY);
    assert_eq!(
        world_of(&world, child).0,
        Affine2::from_translation(Vec2::new(1.0, 0.0))
    );
}

// =============================================================================
// Structure changes seen by propagation
// =============================================================================

#[test]
fn root_becoming_child_moves_its_subtree() {
    let mut world = World::new();
    let anchor = world.spawn(LocalTransform2D::from_xy(0.0, 100.0)).id();
    let root = world.spawn(LocalTransform2D::from_xy(5.0, 0.0)).id();
    let leaf = world
        .spawn((LocalTransform2D::from_xy(1.0, 0.0), ParentRef(root)))
        .id();

    let mut pipeline = HierarchyPipeline::new();
    pipeline.run(&mut world);
    assert!(approx_eq(world_of(&world, leaf).position().y, 0.0));

    world.entity_mut(root).insert(ParentRef(anchor));
    pipeline.run(&mut world);

    assert_eq!(world_of(&world, root).position(), Vec2::new(5.0, 100.0));
    assert_eq!(world_of(&world, leaf).position(), Vec2::new(6.0, 100.0));
}

#[test]
fn depth_guard_stops_descent() {
    let mut world = World::new();
    world.insert_resource(HierarchyConfig {
        max_depth: 2,
        ..HierarchyConfig::new()
    });
    let r = world.spawn(LocalTransform2D::from_xy(1.0, 0.0)).id();
    let a = world
        .spawn((LocalTransform2D::from_xy(1.0, 0.0), ParentRef(r)))
        .id();
    let b = world
        .spawn((LocalTransform2D::from_xy(1.0, 0.0), ParentRef(a)))
        .id();
    let c = world
        .spawn((LocalTransform2D::from_xy(1.0, 0.0), ParentRef(b)))
        .id();

    tick(&mut world);

    assert_eq!(world_of(&world, b).position(), Vec2::new(3.0, 0.0));
    assert_eq!(
        world_of(&world, c),
        WorldTransform2D::IDENTITY,
        "Nodes past max_depth are not propagated"
    );
}

#[test]
fn many_roots_propagate_in_parallel_batches() {
    let mut world = World::new();
    world.insert_resource(HierarchyConfig {
        batch_size: 8,
        ..HierarchyConfig::new()
    });

    let mut leaves = Vec::new();
    for i in 0..256 {
        let root = world.spawn(LocalTransform2D::from_xy(i as f32, 0.0)).id();
        let mid = world
            .spawn((LocalTransform2D::from_xy(0.0, 1.0), ParentRef(root)))
            .id();
        let leaf = world
            .spawn((LocalTransform2D::from_xy(0.0, 1.0), ParentRef(mid)))
            .id();
        leaves.push((i, leaf));
    }

    let mut pipeline = HierarchyPipeline::new();
    pipeline.run(&mut world);

    for (i, leaf) in leaves {
        assert_eq!(world_of(&world, leaf).position(), Vec2::new(i as f32, 2.0));
    }
    let stats = *world.resource::<HierarchyStats>();
    assert_eq!(stats.roots_written, 255, "Root at the origin keeps its identity");
    assert_eq!(stats.lists_created, 512);
}
