//! libmpv-backed media surface for feed slides.
//!
//! Each slide embeds mpv through the OpenGL render API in a GTK4 GLArea.
//! Unlike a standalone player, a feed slide must come up silent and paused:
//! sources are attached with `pause=yes` and playback only starts when the
//! controller says so. libmpv also resolves adaptive-stream manifests, so a
//! manifest URL is attached like any other source.

use glib::clone;
use gtk4::gdk;
use gtk4::prelude::*;
use gtk4::{glib, GLArea};
use libmpv2::render::{OpenGLInitParams, RenderContext, RenderParam, RenderParamApiType};
use libmpv2::Mpv;
use once_cell::sync::OnceCell;
use std::cell::RefCell;
use std::ffi::c_void;
use std::rc::Rc;

use super::handle::{MediaHandle, PlaybackError, Preload};

/// Ensure epoxy is initialized once
static EPOXY_INITIALIZED: OnceCell<()> = OnceCell::new();

fn ensure_epoxy_initialized() {
    EPOXY_INITIALIZED.get_or_init(|| {
        // GTK4 already links epoxy, so symbols should be available in the
        // current process.
        epoxy::load_with(|s| unsafe {
            let handle = libc::dlopen(std::ptr::null(), libc::RTLD_NOW | libc::RTLD_GLOBAL);
            if handle.is_null() {
                return std::ptr::null();
            }
            let c_str =
                std::ffi::CString::new(s).expect("Failed to create CString for symbol lookup");
            let sym = libc::dlsym(handle, c_str.as_ptr());
            libc::dlclose(handle);
            sym
        });
    });
}

/// GL context wrapper for OpenGL init params (unit type since we use epoxy)
struct GlContext;

/// Inner mpv state shared with the GL callbacks.
struct SurfaceState {
    mpv: Option<Mpv>,
    render_ctx: Option<RenderContext>,
    /// URL currently attached, or queued for attach before GL realize.
    source_url: Option<String>,
    pending_attach: Option<String>,
    /// Play requested before mpv was initialized.
    pending_play: bool,
    playing: bool,
    render_timer: Option<glib::SourceId>,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            mpv: None,
            render_ctx: None,
            source_url: None,
            pending_attach: None,
            pending_play: false,
            playing: false,
            render_timer: None,
        }
    }
}

/// One slide's media element: mpv embedded in a GLArea.
pub struct MpvSurface {
    gl_area: GLArea,
    state: Rc<RefCell<SurfaceState>>,
}

impl MpvSurface {
    pub fn new() -> Self {
        let gl_area = GLArea::new();
        gl_area.set_auto_render(false);
        gl_area.set_has_depth_buffer(false);
        gl_area.set_has_stencil_buffer(false);
        gl_area.set_hexpand(true);
        gl_area.set_vexpand(true);
        gl_area.set_allowed_apis(gdk::GLAPI::GL | gdk::GLAPI::GLES);

        let state = Rc::new(RefCell::new(SurfaceState::default()));

        let surface = Self { gl_area, state };
        surface.setup_gl_callbacks();
        surface
    }

    /// The widget to embed in the slide.
    pub fn widget(&self) -> &GLArea {
        &self.gl_area
    }

    fn setup_gl_callbacks(&self) {
        let state = self.state.clone();

        // Realize: initialize mpv once the GL context exists, then attach
        // any source that was requested before the widget was mapped.
        self.gl_area.connect_realize(clone!(
            #[strong]
            state,
            move |gl_area| {
                gl_area.make_current();
                if let Some(err) = gl_area.error() {
                    tracing::error!("GLArea error on realize: {}", err);
                    return;
                }
                if state.borrow().mpv.is_some() {
                    return;
                }

                ensure_epoxy_initialized();

                match Self::init_mpv() {
                    Ok((mpv, render_ctx)) => {
                        let mut state_mut = state.borrow_mut();
                        state_mut.mpv = Some(mpv);
                        state_mut.render_ctx = Some(render_ctx);
                        let pending = state_mut.pending_attach.take();
                        let pending_play = std::mem::take(&mut state_mut.pending_play);
                        drop(state_mut);
                        tracing::debug!("mpv initialized for slide surface");

                        if let Some(url) = pending {
                            Self::load_url(&state, &url);
                            if pending_play {
                                Self::set_paused(&state, false);
                                Self::start_render_timer(&state, gl_area.clone());
                            }
                        }
                        gl_area.queue_render();
                    }
                    Err(e) => {
                        tracing::error!("Failed to initialize mpv: {}", e);
                    }
                }
            }
        ));

        // Unrealize: drop render context first, then mpv.
        self.gl_area.connect_unrealize(clone!(
            #[strong]
            state,
            move |gl_area| {
                gl_area.make_current();
                let mut state = state.borrow_mut();
                if let Some(timer) = state.render_timer.take() {
                    timer.remove();
                }
                state.render_ctx = None;
                state.mpv = None;
                state.playing = false;
            }
        ));

        self.gl_area.connect_render(clone!(
            #[strong]
            state,
            move |gl_area, _gl_context| {
                let state = state.borrow();
                if let Some(ref render_ctx) = state.render_ctx {
                    let scale = gl_area.scale_factor();
                    let width = gl_area.width() * scale;
                    let height = gl_area.height() * scale;
                    // flip=true because GTK's coordinate system is flipped
                    if let Err(e) = render_ctx.render::<GlContext>(0, width, height, true) {
                        tracing::error!("mpv render error: {}", e);
                    }
                }
                glib::Propagation::Stop
            }
        ));

        self.gl_area
            .connect_resize(move |gl_area, _width, _height| {
                gl_area.queue_render();
            });
    }

    fn init_mpv() -> Result<(Mpv, RenderContext), Box<dyn std::error::Error>> {
        // GTK initialization may reset locale after program start; enforce
        // this right before touching libmpv, which requires LC_NUMERIC=C.
        let locale_set = unsafe { libc::setlocale(libc::LC_NUMERIC, b"C\0".as_ptr().cast()) };
        if locale_set.is_null() {
            tracing::warn!("Failed to set LC_NUMERIC=C before mpv init");
        }

        let mut mpv = Mpv::with_initializer(|init| {
            // Hardware decoding with auto fallback
            init.set_option("hwdec", "auto-safe")?;

            // Video output configuration for OpenGL rendering
            init.set_option("vo", "libmpv")?;

            // Audio output - try pipewire first, then pulse, then alsa
            init.set_option("ao", "pipewire,pulse,alsa")?;

            // Keep the element alive at end of media; the controller decides
            // whether to loop.
            init.set_option("keep-open", "yes")?;

            // Slides come up paused and muted; the controller flips both.
            init.set_option("pause", "yes")?;
            init.set_option("mute", "yes")?;

            // Buffering defaults; preload mode adjusts these per slide.
            init.set_option("cache", "yes")?;
            init.set_option("demuxer-max-bytes", "50MiB")?;

            // We draw our own UI.
            init.set_option("osd-level", 0i64)?;
            init.set_option("terminal", false)?;
            init.set_option("input-default-bindings", false)?;
            init.set_option("msg-level", "all=warn")?;

            Ok(())
        })?;

        fn get_proc_address(_ctx: &GlContext, name: &str) -> *mut c_void {
            epoxy::get_proc_addr(name) as *mut c_void
        }

        let gl_init_params = OpenGLInitParams {
            get_proc_address,
            ctx: GlContext,
        };

        let render_params = vec![
            RenderParam::ApiType(RenderParamApiType::OpenGl),
            RenderParam::InitParams(gl_init_params),
        ];

        // SAFETY: exclusive access to mpv during initialization.
        let render_ctx =
            unsafe { RenderContext::new(mpv.ctx.as_mut(), render_params.into_iter())? };

        Ok((mpv, render_ctx))
    }

    fn load_url(state: &Rc<RefCell<SurfaceState>>, url: &str) {
        let mut state_mut = state.borrow_mut();
        if let Some(ref mpv) = state_mut.mpv {
            // Stay paused across the load; playback is the controller's call.
            let _ = mpv.set_property("pause", true);
            if let Err(e) = mpv.command("loadfile", &[url, "replace"]) {
                tracing::error!(url, "Failed to load source: {}", e);
                return;
            }
            state_mut.source_url = Some(url.to_string());
            state_mut.playing = false;
            tracing::debug!(url, "Source attached");
        }
    }

    fn set_paused(state: &Rc<RefCell<SurfaceState>>, paused: bool) {
        let mut state_mut = state.borrow_mut();
        if let Some(ref mpv) = state_mut.mpv {
            let _ = mpv.set_property("pause", paused);
            state_mut.playing = !paused;
        }
    }

    /// Drive redraws while playing. mpv render updates are polled rather
    /// than callback-driven; ~30 fps is plenty for a feed slide.
    fn start_render_timer(state: &Rc<RefCell<SurfaceState>>, gl_area: GLArea) {
        if state.borrow().render_timer.is_some() {
            return;
        }
        let timer_state = state.clone();
        let source_id = glib::timeout_add_local(std::time::Duration::from_millis(33), move || {
            let mut state = timer_state.borrow_mut();
            if !state.playing || state.mpv.is_none() {
                state.render_timer = None;
                return glib::ControlFlow::Break;
            }
            drop(state);
            gl_area.queue_render();
            glib::ControlFlow::Continue
        });
        state.borrow_mut().render_timer = Some(source_id);
    }

    fn get_property_f64(&self, name: &str) -> Option<f64> {
        let state = self.state.borrow();
        let mpv = state.mpv.as_ref()?;
        mpv.get_property::<f64>(name).ok()
    }
}

impl Default for MpvSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MpvSurface {
    fn drop(&mut self) {
        if let Some(timer) = self.state.borrow_mut().render_timer.take() {
            timer.remove();
        }
    }
}

impl MediaHandle for MpvSurface {
    fn attach_source(&mut self, url: &str) {
        {
            let mut state = self.state.borrow_mut();
            state.source_url = Some(url.to_string());
            if state.mpv.is_none() {
                // GL context not realized yet; attach once it is.
                state.pending_attach = Some(url.to_string());
                return;
            }
        }
        Self::load_url(&self.state, url);
    }

    fn has_source(&self) -> bool {
        self.state.borrow().source_url.is_some()
    }

    fn is_playing(&self) -> bool {
        self.state.borrow().playing
    }

    fn set_muted(&mut self, muted: bool) {
        let state = self.state.borrow();
        if let Some(ref mpv) = state.mpv {
            let _ = mpv.set_property("mute", muted);
        }
    }

    fn muted(&self) -> bool {
        let state = self.state.borrow();
        match state.mpv {
            Some(ref mpv) => mpv.get_property("mute").unwrap_or(true),
            None => true,
        }
    }

    fn position(&self) -> f64 {
        self.get_property_f64("time-pos").unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.get_property_f64("duration")
            .filter(|d| d.is_finite() && *d > 0.0)
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        {
            let mut state = self.state.borrow_mut();
            if state.source_url.is_none() {
                return Err(PlaybackError::NoSource);
            }
            if state.mpv.is_none() {
                // Not realized yet; remember the intent for the realize
                // handler.
                state.pending_play = true;
                return Ok(());
            }
            if let Some(ref mpv) = state.mpv {
                mpv.set_property("pause", false)
                    .map_err(|e| PlaybackError::StartRejected(e.to_string()))?;
            }
            state.playing = true;
        }
        Self::start_render_timer(&self.state, self.gl_area.clone());
        self.gl_area.queue_render();
        Ok(())
    }

    fn pause(&mut self) {
        self.state.borrow_mut().pending_play = false;
        Self::set_paused(&self.state, true);
    }

    fn seek(&mut self, position: f64) {
        let state = self.state.borrow();
        if let Some(ref mpv) = state.mpv {
            let pos_str = format!("{:.3}", position);
            let _ = mpv.command("seek", &[&pos_str, "absolute"]);
        }
        drop(state);
        self.gl_area.queue_render();
    }

    fn set_preload(&mut self, preload: Preload) {
        let state = self.state.borrow();
        if let Some(ref mpv) = state.mpv {
            let aggressive = preload == Preload::Auto;
            let _ = mpv.set_property("cache", if aggressive { "yes" } else { "no" });
        }
    }

    fn reached_end(&self) -> bool {
        let state = self.state.borrow();
        match state.mpv {
            Some(ref mpv) => mpv.get_property("eof-reached").unwrap_or(false),
            None => false,
        }
    }
}
