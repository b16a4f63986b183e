//! FLIPSIDE - a card that flips over and plays the video on you.
//! Click the front to flip, click outside the player to flip back.

use bevy::{prelude::*, window::PrimaryWindow};
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

// SETTINGS
const WINDOW_WIDTH: f32 = 1280.0;
const WINDOW_HEIGHT: f32 = 720.0;
const FLIP_DURATION: f32 = 0.6;
const CAPTION_DELAY: f32 = 0.3;
const BACK_ANGLE_DEG: f32 = -180.0;
const HOVER_SCALE: f32 = 1.05;

// Embed contract (third-party player, fire-and-forget)
const EMBED_BASE: &str = "https://www.youtube.com/embed/X5cOk0U_f1g";
const SHARE_TOKEN: &str = "6DuondIInGOjWVel";
const START_SECONDS: u32 = 44;

// COLORS
const BG_COLOR: Color = Color::srgb(0.06, 0.06, 0.10);
const CARD_FRONT_COLOR: Color = Color::srgb(0.93, 0.35, 0.45);
const CARD_BACK_COLOR: Color = Color::srgb(0.13, 0.14, 0.20);
const PANEL_COLOR: Color = Color::srgb(0.03, 0.03, 0.05);
const CAPTION_YELLOW: Color = Color::srgb(1.0, 0.95, 0.0);

// Sizes
const CARD_W: f32 = 460.0;
const CARD_H: f32 = 320.0;
const CARD_POS: Vec3 = Vec3::new(0.0, -30.0, 0.0);
const MEDIA_MARGIN: f32 = 28.0;
const MEDIA_W: f32 = CARD_W - 2.0 * MEDIA_MARGIN;
const MEDIA_H: f32 = MEDIA_W * 9.0 / 16.0;

// Components
#[derive(Component)]
struct FlipCard;

/// Tween state for the card rotation. `current_deg` is the live angle,
/// `t` the normalized progress toward `target_deg`.
#[derive(Component)]
struct FlipAnim {
    current_deg: f32,
    from_deg: f32,
    target_deg: f32,
    t: f32,
    hover_scale: f32,
}

impl Default for FlipAnim {
    fn default() -> Self {
        Self {
            current_deg: 0.0,
            from_deg: 0.0,
            target_deg: 0.0,
            t: 1.0,
            hover_scale: 1.0,
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Face {
    Front,
    Back,
}

#[derive(Component)]
struct CardFace {
    side: Face,
}

/// One live embed instance. The token keys the entity identity so a remount
/// never reuses a stale player.
#[derive(Component)]
struct MediaEmbed {
    token: u64,
}

#[derive(Component)]
struct EmbedSource(String);

#[derive(Component)]
struct CaptionBubble {
    base_y: f32,
}

#[derive(Component)]
struct BgShape {
    spin_speed: f32,
    pulse_speed: f32,
    phase: f32,
}

#[derive(Component)]
struct Particle {
    vel: Vec2,
    phase: f32,
    spin: f32,
}

// Resources

/// The one authoritative piece of state: which face of the card is up.
#[derive(Resource, Default)]
struct FlipState {
    flipped: bool,
}

impl FlipState {
    /// Idempotent: flipping an already-flipped card changes nothing.
    fn flip(&mut self) {
        self.flipped = true;
    }

    fn flip_back(&mut self) {
        self.flipped = false;
    }
}

/// Media reveal bookkeeping: the pending caption countdown (seconds left,
/// None when disarmed) and the last token handed out.
#[derive(Resource, Default)]
struct Reveal {
    caption_wait: Option<f32>,
    last_token: u64,
}

/// Owned by the composition root; the caption bubble renders iff true.
#[derive(Resource, Default)]
struct CaptionVisible(bool);

fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

fn flip_target_deg(flipped: bool) -> f32 {
    if flipped {
        BACK_ANGLE_DEG
    } else {
        0.0
    }
}

/// The front face owns the card until the rotation crosses the midpoint.
fn front_showing(angle_deg: f32) -> bool {
    angle_deg > -90.0
}

/// Fresh cache-busting token: wall-clock millis, clamped so two mounts in the
/// same millisecond still advance.
fn next_token(last: u64) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    now.max(last + 1)
}

fn embed_src() -> String {
    format!("{EMBED_BASE}?si={SHARE_TOKEN}&controls=0&start={START_SECONDS}&autoplay=1&mute=0")
}

fn card_contains(p: Vec2) -> bool {
    (p.x - CARD_POS.x).abs() <= CARD_W / 2.0 && (p.y - CARD_POS.y).abs() <= CARD_H / 2.0
}

fn media_panel_contains(p: Vec2) -> bool {
    (p.x - CARD_POS.x).abs() <= MEDIA_W / 2.0 && (p.y - CARD_POS.y).abs() <= MEDIA_H / 2.0
}

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "FLIPSIDE".into(),
                resolution: (WINDOW_WIDTH, WINDOW_HEIGHT).into(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(ClearColor(BG_COLOR))
        .init_resource::<FlipState>()
        .init_resource::<Reveal>()
        .init_resource::<CaptionVisible>()
        .add_systems(Startup, setup)
        .add_systems(PostStartup, validate_card_faces)
        // Chained so a flip-back cancels the caption in the same tick.
        .add_systems(Update, (click_card, reveal_media, caption_delay_tick).chain())
        .add_systems(
            Update,
            (
                hover_card,
                animate_flip,
                apply_flip_pose,
                dress_media_embed,
                sync_caption_visibility,
                animate_caption,
                animate_bg_shapes,
                animate_particles,
            ),
        )
        .run();
}

fn setup(
    mut cmd: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut mats: ResMut<Assets<ColorMaterial>>,
) {
    // Camera
    cmd.spawn(Camera2d);

    // The card: one rig, two faces
    let face_mesh = meshes.add(Rectangle::new(CARD_W, CARD_H));
    cmd.spawn((
        Transform::from_translation(CARD_POS),
        Visibility::default(),
        FlipCard,
        FlipAnim::default(),
    ))
    .with_children(|card| {
        card.spawn((
            Mesh2d(face_mesh.clone()),
            MeshMaterial2d(mats.add(ColorMaterial::from(CARD_FRONT_COLOR))),
            Transform::from_xyz(0.0, 0.0, 1.0),
            CardFace { side: Face::Front },
        ))
        .with_children(|face| {
            face.spawn((
                Text2d::new("Click the card to flip"),
                TextFont {
                    font_size: 30.0,
                    ..default()
                },
                TextColor(Color::WHITE),
                Transform::from_xyz(0.0, 0.0, 1.0),
            ));
        });

        card.spawn((
            Mesh2d(face_mesh),
            MeshMaterial2d(mats.add(ColorMaterial::from(CARD_BACK_COLOR))),
            Transform::from_xyz(0.0, 0.0, 1.0),
            Visibility::Hidden,
            CardFace { side: Face::Back },
        ));
    });

    // Caption bubble (hidden until the reveal says otherwise)
    let caption_y = CARD_POS.y + CARD_H / 2.0 + 90.0;
    cmd.spawn((
        Text2d::new("GOTCHA!!"),
        TextFont {
            font_size: 64.0,
            ..default()
        },
        TextColor(CAPTION_YELLOW),
        Transform::from_xyz(0.0, caption_y, 10.0),
        Visibility::Hidden,
        CaptionBubble { base_y: caption_y },
    ));

    // Hint at the bottom
    cmd.spawn((
        Text2d::new("Click outside the video to flip back"),
        TextFont {
            font_size: 20.0,
            ..default()
        },
        TextColor(Color::srgba(1.0, 1.0, 1.0, 0.4)),
        Transform::from_xyz(0.0, -WINDOW_HEIGHT / 2.0 + 50.0, 10.0),
    ));

    let mut rng = rand::rng();

    for i in 0..9 {
        let size = rng.random_range(150.0..500.0);
        let hue = (i as f32 / 9.0) * 360.0;
        let c = Color::hsla(hue, 0.6, 0.5, rng.random_range(0.02..0.05));
        let sides = [3, 4, 5, 6][rng.random_range(0..4)];
        let mesh = meshes.add(RegularPolygon::new(size, sides));
        cmd.spawn((
            Mesh2d(mesh),
            MeshMaterial2d(mats.add(ColorMaterial::from(c))),
            Transform::from_xyz(
                rng.random_range(-700.0..700.0),
                rng.random_range(-400.0..400.0),
                -10.0,
            ),
            BgShape {
                spin_speed: rng.random_range(-0.12..0.12),
                pulse_speed: rng.random_range(0.2..0.6),
                phase: rng.random_range(0.0..std::f32::consts::TAU),
            },
        ));
    }

    for _ in 0..48 {
        let c = Color::hsla(
            rng.random_range(0.0..360.0),
            0.5,
            0.5,
            rng.random_range(0.03..0.10),
        );
        let mesh = meshes.add(Circle::new(rng.random_range(5.0..26.0)));
        cmd.spawn((
            Mesh2d(mesh),
            MeshMaterial2d(mats.add(ColorMaterial::from(c))),
            Transform::from_xyz(
                rng.random_range(-WINDOW_WIDTH / 2.0..WINDOW_WIDTH / 2.0),
                rng.random_range(-WINDOW_HEIGHT / 2.0..WINDOW_HEIGHT / 2.0),
                -5.0,
            ),
            Particle {
                vel: Vec2::new(rng.random_range(-10.0..10.0), rng.random_range(6.0..20.0)),
                phase: rng.random_range(0.0..std::f32::consts::TAU),
                spin: rng.random_range(-0.4..0.4),
            },
        ));
    }
}

/// Programmer-error guard: faces only make sense inside a card. Panics
/// loudly at startup rather than silently rendering nonsense.
fn validate_card_faces(
    rigs: Query<&Children, With<FlipCard>>,
    faces: Query<(&CardFace, Option<&Parent>)>,
    rig_check: Query<(), With<FlipCard>>,
) {
    for (_, parent) in faces.iter() {
        let inside_card = parent.is_some_and(|p| rig_check.get(p.get()).is_ok());
        if !inside_card {
            panic!("CardFace must be spawned as a child of a FlipCard");
        }
    }

    for children in rigs.iter() {
        let mut fronts = 0;
        let mut backs = 0;
        for child in children.iter() {
            if let Ok((face, _)) = faces.get(*child) {
                match face.side {
                    Face::Front => fronts += 1,
                    Face::Back => backs += 1,
                }
            }
        }
        if fronts != 1 || backs != 1 {
            panic!(
                "FlipCard needs exactly one front and one back face (got {fronts} front, {backs} back)"
            );
        }
    }
}

fn click_card(
    mouse: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cam: Query<(&Camera, &GlobalTransform)>,
    rigs: Query<&FlipAnim, With<FlipCard>>,
    mut flip: ResMut<FlipState>,
) {
    if !mouse.just_pressed(MouseButton::Left) {
        return;
    }

    let Ok(win) = windows.get_single() else {
        return;
    };
    let Ok((camera, cam_t)) = cam.get_single() else {
        return;
    };
    let Some(cursor) = win.cursor_position() else {
        return;
    };
    let Some(world) = camera.viewport_to_world_2d(cam_t, cursor).ok() else {
        return;
    };
    let Ok(anim) = rigs.get_single() else {
        return;
    };

    if !card_contains(world) {
        return;
    }

    if front_showing(anim.current_deg) {
        flip.flip();
    } else {
        // Clicks on the player stay with the player.
        if media_panel_contains(world) {
            return;
        }
        flip.flip_back();
    }
}

fn hover_card(
    windows: Query<&Window, With<PrimaryWindow>>,
    cam: Query<(&Camera, &GlobalTransform)>,
    mut rigs: Query<&mut FlipAnim, With<FlipCard>>,
    time: Res<Time>,
) {
    let hovered = (|| {
        let win = windows.get_single().ok()?;
        let (camera, cam_t) = cam.get_single().ok()?;
        let cursor = win.cursor_position()?;
        let world = camera.viewport_to_world_2d(cam_t, cursor).ok()?;
        Some(card_contains(world))
    })()
    .unwrap_or(false);

    for mut anim in rigs.iter_mut() {
        let target = if hovered && front_showing(anim.current_deg) {
            HOVER_SCALE
        } else {
            1.0
        };
        let k = (12.0 * time.delta_secs()).min(1.0);
        anim.hover_scale += (target - anim.hover_scale) * k;
    }
}

/// Tween the card angle toward the target the flip state dictates. A flip
/// mid-animation retargets from the current angle, so reversals look smooth.
fn animate_flip(
    time: Res<Time>,
    flip: Res<FlipState>,
    mut rigs: Query<&mut FlipAnim, With<FlipCard>>,
) {
    let target = flip_target_deg(flip.flipped);
    for mut anim in rigs.iter_mut() {
        if anim.target_deg != target {
            anim.from_deg = anim.current_deg;
            anim.target_deg = target;
            anim.t = 0.0;
        }
        if anim.t < 1.0 {
            anim.t = (anim.t + time.delta_secs() / FLIP_DURATION).min(1.0);
            let eased = ease_in_out_cubic(anim.t);
            anim.current_deg = anim.from_deg + (anim.target_deg - anim.from_deg) * eased;
        }
    }
}

/// Project the Y-rotation into 2-D: the card narrows to a sliver at the
/// midpoint and the faces swap visibility there.
fn apply_flip_pose(
    mut rigs: Query<(&FlipAnim, &mut Transform, &Children), With<FlipCard>>,
    mut faces: Query<(&CardFace, &mut Visibility)>,
) {
    for (anim, mut t, children) in rigs.iter_mut() {
        let fold = anim.current_deg.to_radians().cos().abs();
        t.scale = Vec3::new(fold * anim.hover_scale, anim.hover_scale, 1.0);

        let front = front_showing(anim.current_deg);
        for child in children.iter() {
            if let Ok((face, mut vis)) = faces.get_mut(*child) {
                *vis = match (face.side, front) {
                    (Face::Front, true) | (Face::Back, false) => Visibility::Inherited,
                    _ => Visibility::Hidden,
                };
            }
        }
    }
}

/// The lazy media lifecycle. Edge-triggered on the flip boolean so repeated
/// idempotent flip() calls never remount the player.
///
/// Mount: fresh token, embed spawned under the back face, caption delay armed.
/// Unmount: caption hidden and delay cancelled in this same tick, embed
/// despawned outright - unmounting, not pausing, is what stops playback.
fn reveal_media(
    mut cmd: Commands,
    flip: Res<FlipState>,
    mut reveal: ResMut<Reveal>,
    mut caption: ResMut<CaptionVisible>,
    faces: Query<(Entity, &CardFace)>,
    embeds: Query<Entity, With<MediaEmbed>>,
    mut was_flipped: Local<bool>,
) {
    if flip.flipped == *was_flipped {
        return;
    }
    *was_flipped = flip.flipped;

    if flip.flipped {
        let back = faces
            .iter()
            .find(|(_, f)| f.side == Face::Back)
            .map(|(e, _)| e)
            .expect("media reveal requires a FlipCard with a back face");

        let token = next_token(reveal.last_token);
        reveal.last_token = token;
        reveal.caption_wait = Some(CAPTION_DELAY);

        let src = embed_src();
        info!("mounting embed {token}: {src}");
        cmd.entity(back).with_children(|face| {
            face.spawn((
                MediaEmbed { token },
                EmbedSource(src),
                Transform::from_xyz(0.0, 0.0, 1.0),
                Visibility::Inherited,
            ));
        });
    } else {
        caption.0 = false;
        reveal.caption_wait = None;
        for e in embeds.iter() {
            cmd.entity(e).despawn_recursive();
        }
    }
}

/// Counts down the armed caption delay; fires the show exactly once.
fn caption_delay_tick(
    time: Res<Time>,
    mut reveal: ResMut<Reveal>,
    mut caption: ResMut<CaptionVisible>,
) {
    let Some(mut wait) = reveal.caption_wait else {
        return;
    };
    wait -= time.delta_secs();
    reveal.caption_wait = if wait <= 0.0 {
        caption.0 = true;
        None
    } else {
        Some(wait)
    };
}

/// Visuals for freshly mounted embeds: a 16:9 panel standing in for the
/// player chrome. Kept apart from the lifecycle so the logic stays headless.
fn dress_media_embed(
    mut cmd: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut mats: ResMut<Assets<ColorMaterial>>,
    new_embeds: Query<Entity, Added<MediaEmbed>>,
) {
    for e in new_embeds.iter() {
        let panel = meshes.add(Rectangle::new(MEDIA_W, MEDIA_H));
        cmd.entity(e)
            .insert((
                Mesh2d(panel),
                MeshMaterial2d(mats.add(ColorMaterial::from(PANEL_COLOR))),
            ))
            .with_children(|p| {
                p.spawn((
                    Text2d::new("\u{25b6}  now playing"),
                    TextFont {
                        font_size: 24.0,
                        ..default()
                    },
                    TextColor(Color::srgba(1.0, 1.0, 1.0, 0.8)),
                    Transform::from_xyz(0.0, 0.0, 1.0),
                ));
            });
    }
}

fn sync_caption_visibility(
    caption: Res<CaptionVisible>,
    mut bubbles: Query<&mut Visibility, With<CaptionBubble>>,
) {
    for mut vis in bubbles.iter_mut() {
        *vis = if caption.0 {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
    }
}

fn animate_caption(time: Res<Time>, mut bubbles: Query<(&CaptionBubble, &mut Transform)>) {
    for (bubble, mut t) in bubbles.iter_mut() {
        t.translation.y = bubble.base_y + (time.elapsed_secs() * 4.0).sin() * 8.0;
    }
}

fn animate_bg_shapes(time: Res<Time>, mut shapes: Query<(&mut Transform, &BgShape)>) {
    let now = time.elapsed_secs();
    for (mut t, s) in shapes.iter_mut() {
        t.rotation = Quat::from_rotation_z(now * s.spin_speed + s.phase);
        t.scale = Vec3::splat(1.0 + (now * s.pulse_speed + s.phase).sin() * 0.08);
    }
}

fn animate_particles(time: Res<Time>, mut particles: Query<(&mut Transform, &Particle)>) {
    let now = time.elapsed_secs();
    for (mut t, p) in particles.iter_mut() {
        t.translation.x += p.vel.x * time.delta_secs();
        t.translation.y += p.vel.y * time.delta_secs();
        t.rotation = Quat::from_rotation_z(now * p.spin + p.phase);

        if t.translation.y > WINDOW_HEIGHT / 2.0 + 40.0 {
            t.translation.y = -WINDOW_HEIGHT / 2.0 - 40.0;
        }
        let half_w = WINDOW_WIDTH / 2.0 + 40.0;
        if t.translation.x.abs() > half_w {
            t.translation.x = -t.translation.x.signum() * half_w;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Headless app with only the lifecycle systems and a hand-driven clock.
    fn logic_app() -> App {
        let mut app = App::new();
        app.init_resource::<FlipState>();
        app.init_resource::<Reveal>();
        app.init_resource::<CaptionVisible>();
        app.init_resource::<Time>();
        app.world_mut()
            .spawn((
                FlipCard,
                FlipAnim::default(),
                Transform::default(),
                Visibility::default(),
            ))
            .with_children(|card| {
                card.spawn((
                    CardFace { side: Face::Front },
                    Transform::default(),
                    Visibility::default(),
                ));
                card.spawn((
                    CardFace { side: Face::Back },
                    Transform::default(),
                    Visibility::Hidden,
                ));
            });
        app.add_systems(Update, (reveal_media, caption_delay_tick).chain());
        app
    }

    fn advance(app: &mut App, ms: u64) {
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_millis(ms));
        app.update();
    }

    #[test]
    fn flip_actions_are_idempotent() {
        let mut state = FlipState::default();
        assert!(!state.flipped);

        state.flip();
        state.flip();
        assert!(state.flipped);

        state.flip_back();
        state.flip_back();
        assert!(!state.flipped);

        // Parity of the last action wins, repetition is irrelevant.
        state.flip();
        state.flip_back();
        state.flip();
        assert!(state.flipped);
    }

    #[test]
    fn ease_endpoints_are_stable() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!(ease_in_out_cubic(0.25) < ease_in_out_cubic(0.5));
        assert!(ease_in_out_cubic(0.5) < ease_in_out_cubic(0.75));
    }

    #[test]
    fn face_swaps_at_midpoint() {
        assert!(front_showing(0.0));
        assert!(front_showing(-89.9));
        assert!(!front_showing(-90.1));
        assert!(!front_showing(BACK_ANGLE_DEG));
    }

    #[test]
    fn tokens_strictly_increase() {
        let a = next_token(0);
        let b = next_token(a);
        let c = next_token(b);
        assert!(a > 0);
        assert!(b > a);
        assert!(c > b);
    }

    #[test]
    fn embed_src_carries_playback_params() {
        let src = embed_src();
        assert!(src.starts_with("https://www.youtube.com/embed/X5cOk0U_f1g?"));
        assert!(src.contains("si=6DuondIInGOjWVel"));
        assert!(src.contains("controls=0"));
        assert!(src.contains("start=44&autoplay=1"));
        assert!(src.contains("mute=0"));
    }

    #[test]
    fn player_clicks_do_not_flip_back() {
        let center = Vec2::new(CARD_POS.x, CARD_POS.y);
        assert!(card_contains(center));
        assert!(media_panel_contains(center));

        // Card edge is outside the player panel, so it flips back.
        let edge = Vec2::new(CARD_POS.x, CARD_POS.y + CARD_H / 2.0 - 4.0);
        assert!(card_contains(edge));
        assert!(!media_panel_contains(edge));
    }

    #[test]
    fn flip_reveals_media_then_caption_then_cleans_up() {
        let mut app = logic_app();
        app.update();

        // No media, no caption before the flip.
        let world = app.world_mut();
        let mut embeds = world.query::<&MediaEmbed>();
        assert_eq!(embeds.iter(world).count(), 0);
        assert!(!world.resource::<CaptionVisible>().0);

        app.world_mut().resource_mut::<FlipState>().flip();
        advance(&mut app, 16);

        let world = app.world_mut();
        let mut embeds = world.query::<(&MediaEmbed, &EmbedSource)>();
        let (embed, src) = embeds.single(world);
        let first_token = embed.token;
        assert!(src.0.contains("start=44&autoplay=1"));
        assert!(!world.resource::<CaptionVisible>().0);

        // Delay elapses: caption shows, countdown disarms.
        advance(&mut app, 300);
        assert!(app.world().resource::<CaptionVisible>().0);
        assert!(app.world().resource::<Reveal>().caption_wait.is_none());

        // Flip back: caption gone and embed removed on the same tick.
        app.world_mut().resource_mut::<FlipState>().flip_back();
        advance(&mut app, 16);
        assert!(!app.world().resource::<CaptionVisible>().0);
        let world = app.world_mut();
        let mut embeds = world.query::<&MediaEmbed>();
        assert_eq!(embeds.iter(world).count(), 0);

        // Second mount gets a strictly fresher instance.
        app.world_mut().resource_mut::<FlipState>().flip();
        advance(&mut app, 16);
        let world = app.world_mut();
        let mut embeds = world.query::<&MediaEmbed>();
        let embed = embeds.single(world);
        assert!(embed.token > first_token);
    }

    #[test]
    fn flip_back_before_delay_cancels_caption() {
        let mut app = logic_app();
        app.update();

        app.world_mut().resource_mut::<FlipState>().flip();
        advance(&mut app, 16);
        advance(&mut app, 100);
        assert!(!app.world().resource::<CaptionVisible>().0);

        app.world_mut().resource_mut::<FlipState>().flip_back();
        advance(&mut app, 16);

        // Well past the original deadline: the cancelled timer stays dead.
        advance(&mut app, 1000);
        assert!(!app.world().resource::<CaptionVisible>().0);
        assert!(app.world().resource::<Reveal>().caption_wait.is_none());
    }

    #[test]
    fn repeated_flip_calls_do_not_remount() {
        let mut app = logic_app();
        app.update();

        app.world_mut().resource_mut::<FlipState>().flip();
        advance(&mut app, 16);

        let world = app.world_mut();
        let mut embeds = world.query::<&MediaEmbed>();
        let first_token = embeds.single(world).token;

        // flip() again while already flipped: no second player.
        app.world_mut().resource_mut::<FlipState>().flip();
        advance(&mut app, 16);

        let world = app.world_mut();
        let mut embeds = world.query::<&MediaEmbed>();
        assert_eq!(embeds.iter(world).count(), 1);
        assert_eq!(embeds.single(world).token, first_token);
    }

    #[test]
    fn caption_fires_once_per_mount() {
        let mut app = logic_app();
        app.update();

        app.world_mut().resource_mut::<FlipState>().flip();
        advance(&mut app, 16);
        advance(&mut app, 300);
        assert!(app.world().resource::<CaptionVisible>().0);

        // Long idle while mounted: no re-arming, no flicker.
        advance(&mut app, 2000);
        assert!(app.world().resource::<CaptionVisible>().0);
        assert!(app.world().resource::<Reveal>().caption_wait.is_none());
    }

    #[test]
    #[should_panic(expected = "child of a FlipCard")]
    fn card_face_outside_card_panics() {
        let mut app = App::new();
        app.world_mut()
            .spawn((CardFace { side: Face::Front }, Transform::default()));
        app.add_systems(Update, validate_card_faces);
        app.update();
    }

    #[test]
    #[should_panic(expected = "back face")]
    fn reveal_without_back_face_panics() {
        let mut app = App::new();
        app.init_resource::<FlipState>();
        app.init_resource::<Reveal>();
        app.init_resource::<CaptionVisible>();
        app.init_resource::<Time>();
        app.add_systems(Update, reveal_media);

        app.world_mut().resource_mut::<FlipState>().flip();
        app.update();
    }
}
