use crate::browser;
use anyhow::{anyhow, Error, Result};
use futures::channel::oneshot::channel;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlAudioElement, HtmlImageElement};

/// Category a loaded asset is filed under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Sound,
    Json,
}

/// Resolved shape of one pending load operation.
#[derive(Clone, Debug)]
pub struct AssetDescriptor {
    pub name: String,
    pub kind: AssetKind,
    pub value: JsValue,
}

/// One asset being fetched and decoded. Resolves to its descriptor, or to
/// the error that aborts the whole batch.
pub type PendingLoad = LocalBoxFuture<'static, Result<AssetDescriptor>>;

/// Categorized store of loaded assets, keyed by name within each category.
///
/// Values stay opaque `JsValue`s; the typed accessors downcast on the way
/// out and return `None` for a missing name or a value of the wrong shape.
#[derive(Clone, Debug, Default)]
pub struct Assets {
    images: HashMap<String, JsValue>,
    sounds: HashMap<String, JsValue>,
    json: HashMap<String, JsValue>,
}

impl Assets {
    pub(crate) fn from_descriptors(descriptors: Vec<AssetDescriptor>) -> Self {
        let mut assets = Assets::default();
        for AssetDescriptor { name, kind, value } in descriptors {
            assets.bucket_mut(kind).insert(name, value);
        }
        assets
    }

    fn bucket_mut(&mut self, kind: AssetKind) -> &mut HashMap<String, JsValue> {
        match kind {
            AssetKind::Image => &mut self.images,
            AssetKind::Sound => &mut self.sounds,
            AssetKind::Json => &mut self.json,
        }
    }

    pub fn get(&self, kind: AssetKind, name: &str) -> Option<&JsValue> {
        let bucket = match kind {
            AssetKind::Image => &self.images,
            AssetKind::Sound => &self.sounds,
            AssetKind::Json => &self.json,
        };
        bucket.get(name)
    }

    pub fn image(&self, name: &str) -> Option<HtmlImageElement> {
        self.images.get(name)?.dyn_ref().cloned()
    }

    pub fn sound(&self, name: &str) -> Option<HtmlAudioElement> {
        self.sounds.get(name)?.dyn_ref().cloned()
    }

    pub fn json(&self, name: &str) -> Option<JsValue> {
        self.json.get(name).cloned()
    }
}

/// Begin loading an image.
/// # Arguments
/// * `name` - key the image is filed under once the batch completes
/// * `source` - path/url of the image
pub fn load_image(name: &str, source: &str) -> PendingLoad {
    let name = name.to_string();
    let source = source.to_string();
    async move {
        let image = fetch_image(&source).await?;
        Ok(AssetDescriptor {
            name,
            kind: AssetKind::Image,
            value: image.into(),
        })
    }
    .boxed_local()
}

/// Begin loading a sound. Resolves once the browser reports it can play the
/// source through without stalling.
pub fn load_sound(name: &str, source: &str) -> PendingLoad {
    let name = name.to_string();
    let source = source.to_string();
    async move {
        let audio = fetch_audio(&source).await?;
        Ok(AssetDescriptor {
            name,
            kind: AssetKind::Sound,
            value: audio.into(),
        })
    }
    .boxed_local()
}

/// Begin loading a JSON document. The parsed value is stored as-is.
pub fn load_json(name: &str, source: &str) -> PendingLoad {
    let name = name.to_string();
    let source = source.to_string();
    async move {
        let value = browser::fetch_json_value(&source).await?;
        Ok(AssetDescriptor {
            name,
            kind: AssetKind::Json,
            value,
        })
    }
    .boxed_local()
}

async fn fetch_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::new_image()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    let success_callback = browser::closure_once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let error_callback = browser::closure_once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!("Error loading image : {:#?}", err)));
        }
    });

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callbacks alive until the image loads or errors
    success_callback.forget();
    error_callback.forget();

    rx.await??;

    Ok(image)
}

async fn fetch_audio(source: &str) -> Result<HtmlAudioElement> {
    let audio = browser::new_audio()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    let success_callback = browser::closure_once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let error_callback = browser::closure_once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!("Error loading audio : {:#?}", err)));
        }
    });

    audio.set_oncanplaythrough(Some(success_callback.as_ref().unchecked_ref()));
    audio.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    audio.set_src(source);

    success_callback.forget();
    error_callback.forget();

    rx.await??;

    Ok(audio)
}
