// Display strings for the detector's English vocabulary. Unknown labels pass through.

use std::collections::HashMap;

const SPANISH_LABELS: [(&str, &str); 66] = [
    ("person", "Persona"),
    ("car", "Auto"),
    ("truck", "Camión"),
    ("bus", "Autobús"),
    ("bicycle", "Bicicleta"),
    ("motorcycle", "Motocicleta"),
    ("dog", "Perro"),
    ("cat", "Gato"),
    ("bird", "Pájaro"),
    ("bottle", "Botella"),
    ("cup", "Taza"),
    ("bowl", "Tazón"),
    ("chair", "Silla"),
    ("couch", "Sofá"),
    ("bed", "Cama"),
    ("dining table", "Mesa"),
    ("laptop", "Laptop"),
    ("cell phone", "Celular"),
    ("book", "Libro"),
    ("clock", "Reloj"),
    ("sports ball", "Pelota"),
    ("apple", "Manzana"),
    ("banana", "Plátano"),
    ("orange", "Naranja"),
    ("pizza", "Pizza"),
    ("cake", "Pastel"),
    ("potted plant", "Planta"),
    ("tv", "TV"),
    ("backpack", "Mochila"),
    ("umbrella", "Paraguas"),
    ("handbag", "Bolso"),
    ("tie", "Corbata"),
    ("suitcase", "Maleta"),
    ("frisbee", "Frisbee"),
    ("skis", "Esquís"),
    ("snowboard", "Snowboard"),
    ("kite", "Cometa"),
    ("baseball bat", "Bate"),
    ("skateboard", "Patineta"),
    ("surfboard", "Tabla de surf"),
    ("tennis racket", "Raqueta"),
    ("wine glass", "Copa"),
    ("fork", "Tenedor"),
    ("knife", "Cuchillo"),
    ("spoon", "Cuchara"),
    ("sandwich", "Sándwich"),
    ("hot dog", "Hot dog"),
    ("donut", "Dona"),
    ("carrot", "Zanahoria"),
    ("broccoli", "Brócoli"),
    ("keyboard", "Teclado"),
    ("mouse", "Mouse"),
    ("remote", "Control"),
    ("microwave", "Microondas"),
    ("oven", "Horno"),
    ("toaster", "Tostadora"),
    ("sink", "Lavabo"),
    ("refrigerator", "Refrigerador"),
    ("vase", "Florero"),
    ("scissors", "Tijeras"),
    ("teddy bear", "Osito"),
    ("hair drier", "Secadora"),
    ("toothbrush", "Cepillo"),
    ("traffic light", "Semáforo"),
    ("stop sign", "Señal de alto"),
    ("bench", "Banca"),
];

/// Raw detector label -> display string.
#[derive(Debug, Clone)]
pub struct LabelTable {
    entries: HashMap<String, String>,
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::spanish()
    }
}

impl LabelTable {
    /// The table shipped with the application.
    pub fn spanish() -> Self {
        Self::from_pairs(SPANISH_LABELS)
    }

    /// A table that shows every raw label unchanged.
    pub fn identity() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Display string for `category`, falling back to the raw label.
    pub fn translate<'a>(&'a self, category: &'a str) -> &'a str {
        self.entries.get(category).map(String::as_str).unwrap_or(category)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
