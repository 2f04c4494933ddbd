/// Default WGSL traversal kernel.
///
/// Bindings: 0 = output image (rgba8unorm, write-only), 1 = occupancy texture
/// (rgba32uint, 128 bits per texel, read via `textureLoad`), 2 = frame
/// constants. The eye position is the translation column of `pixel_to_ray`.
///
/// Render modes: 0 = lit by face normal, 1 = normals, 2 = step count,
/// anything else = ray direction.
pub const TRAVERSE_KERNEL: &str = r#"
struct FrameConstants {
    pixel_to_ray: mat4x4<f32>,
    voxel_resolution: u32,
    render_mode: u32,
};

@group(0) @binding(0)
var out_image: texture_storage_2d<rgba8unorm, write>;

@group(0) @binding(1)
var voxel_bits: texture_3d<u32>;

@group(0) @binding(2)
var<uniform> frame: FrameConstants;

const BACKGROUND: vec4<f32> = vec4<f32>(0.1, 0.1, 0.1, 1.0);

fn is_occupied(cell: vec3<i32>) -> bool {
    let r = frame.voxel_resolution;
    let c = vec3<u32>(cell);
    let bit = c.x + c.y * r + c.z * r * r;
    let texel = bit / 128u;
    let dims = textureDimensions(voxel_bits);
    let coord = vec3<u32>(
        texel % dims.x,
        (texel / dims.x) % dims.y,
        texel / (dims.x * dims.y),
    );
    let packed = textureLoad(voxel_bits, coord, 0);
    let within = bit % 128u;
    let word = packed[within / 32u];
    return ((word >> (within % 32u)) & 1u) != 0u;
}

fn shade(normal: vec3<f32>, cell: vec3<i32>, steps: i32, dir: vec3<f32>) -> vec4<f32> {
    let res = f32(frame.voxel_resolution);
    var color = vec4<f32>(dir * 0.5 + 0.5, 1.0);
    switch frame.render_mode {
        case 0u: {
            let light = normalize(vec3<f32>(0.4, 0.6, 1.0));
            let base = (vec3<f32>(cell) + 0.5) / res;
            let lit = 0.3 + 0.7 * max(dot(normal, light), 0.0);
            color = vec4<f32>(base * lit, 1.0);
        }
        case 1u: {
            color = vec4<f32>(normal * 0.5 + 0.5, 1.0);
        }
        case 2u: {
            let heat = f32(steps) / (res * 3.0);
            color = vec4<f32>(heat, heat, heat, 1.0);
        }
        default: {}
    }
    return color;
}

@compute @workgroup_size(8, 8, 1)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let size = textureDimensions(out_image);
    if (id.x >= size.x || id.y >= size.y) {
        return;
    }

    let origin = frame.pixel_to_ray[3].xyz;
    let through = frame.pixel_to_ray * vec4<f32>(f32(id.x), f32(id.y), 1.0, 1.0);
    let raw_dir = normalize(through.xyz - origin);
    let dir = select(raw_dir, vec3<f32>(1e-6), abs(raw_dir) < vec3<f32>(1e-6));
    let inv = 1.0 / dir;

    let res = f32(frame.voxel_resolution);
    let t0 = (vec3<f32>(0.0) - origin) * inv;
    let t1 = (vec3<f32>(res) - origin) * inv;
    let tmin = min(t0, t1);
    let tmax = max(t0, t1);
    let t_near = max(max(tmin.x, tmin.y), max(tmin.z, 0.0));
    let t_far = min(min(tmax.x, tmax.y), tmax.z);

    var color = BACKGROUND;
    if (frame.render_mode > 2u) {
        color = vec4<f32>(raw_dir * 0.5 + 0.5, 1.0);
    }

    if (t_near <= t_far) {
        let stride = vec3<i32>(sign(dir));
        var normal = vec3<f32>(0.0);
        if (tmin.x >= tmin.y && tmin.x >= tmin.z) {
            normal = vec3<f32>(-f32(stride.x), 0.0, 0.0);
        } else if (tmin.y >= tmin.z) {
            normal = vec3<f32>(0.0, -f32(stride.y), 0.0);
        } else {
            normal = vec3<f32>(0.0, 0.0, -f32(stride.z));
        }

        let entry = origin + dir * (t_near + 1e-4);
        var cell = vec3<i32>(clamp(floor(entry), vec3<f32>(0.0), vec3<f32>(res - 1.0)));
        let delta = abs(inv);
        var side = (vec3<f32>(cell) + max(vec3<f32>(stride), vec3<f32>(0.0)) - entry) * inv;
        let r = i32(frame.voxel_resolution);
        let max_steps = r * 3;

        for (var i = 0; i < max_steps; i = i + 1) {
            if (any(cell < vec3<i32>(0)) || any(cell >= vec3<i32>(r))) {
                break;
            }
            if (is_occupied(cell)) {
                color = shade(normal, cell, i, raw_dir);
                break;
            }
            if (side.x < side.y && side.x < side.z) {
                cell.x += stride.x;
                side.x += delta.x;
                normal = vec3<f32>(-f32(stride.x), 0.0, 0.0);
            } else if (side.y < side.z) {
                cell.y += stride.y;
                side.y += delta.y;
                normal = vec3<f32>(0.0, -f32(stride.y), 0.0);
            } else {
                cell.z += stride.z;
                side.z += delta.z;
                normal = vec3<f32>(0.0, 0.0, -f32(stride.z));
            }
        }
    }

    textureStore(out_image, vec2<i32>(id.xy), color);
}
"#;

/// Fullscreen-triangle blit of the output image onto the surface.
pub const PRESENT_SHADER: &str = r#"
@group(0) @binding(0)
var image: texture_2d<f32>;

@group(0) @binding(1)
var image_sampler: sampler;

struct PresentOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_present(@builtin(vertex_index) index: u32) -> PresentOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: PresentOutput;
    out.clip_position = vec4<f32>(uv * vec2<f32>(2.0, -2.0) + vec2<f32>(-1.0, 1.0), 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_present(in: PresentOutput) -> @location(0) vec4<f32> {
    return textureSample(image, image_sampler, in.uv);
}
"#;
