//! Species lookup table used by the stub detection strategy.
//!
//! Keys are lowercase canonical species names; the descriptive fields feed
//! straight into the optional columns of a detection event.

/// Descriptive profile of one detectable species.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeciesProfile {
    pub name: &'static str,
    pub scientific_name: &'static str,
    pub weight_range: &'static str,
    pub height_range: &'static str,
    pub habitat: &'static str,
    pub conservation_status: &'static str,
    pub diet: &'static str,
    pub lifespan: &'static str,
    pub description: &'static str,
}

/// All species the stub detector can report.
pub const PROFILES: &[SpeciesProfile] = &[
    SpeciesProfile {
        name: "white-tailed deer",
        scientific_name: "Odocoileus virginianus",
        weight_range: "90-310 lbs (41-140 kg)",
        height_range: "3-3.5 ft (0.9-1.1 m)",
        habitat: "Forests, grasslands, and farmlands",
        conservation_status: "Least Concern",
        diet: "Herbivore - leaves, twigs, fruits, nuts",
        lifespan: "4-5 years in wild",
        description: "Common deer species with white underside to tail, raised when alarmed",
    },
    SpeciesProfile {
        name: "red fox",
        scientific_name: "Vulpes vulpes",
        weight_range: "8-15 lbs (3.5-7 kg)",
        height_range: "1-1.3 ft (30-40 cm)",
        habitat: "Forests, grasslands, mountains, deserts",
        conservation_status: "Least Concern",
        diet: "Omnivore - small mammals, birds, fruits, insects",
        lifespan: "2-5 years in wild",
        description: "Medium-sized fox with reddish fur and bushy tail with white tip",
    },
    SpeciesProfile {
        name: "gray wolf",
        scientific_name: "Canis lupus",
        weight_range: "60-145 lbs (27-65 kg)",
        height_range: "2.3-2.8 ft (70-85 cm)",
        habitat: "Forests, mountains, tundra",
        conservation_status: "Least Concern (globally)",
        diet: "Carnivore - large hoofed mammals, smaller animals",
        lifespan: "6-8 years in wild",
        description: "Largest wild canine species, often travel in packs",
    },
    SpeciesProfile {
        name: "black bear",
        scientific_name: "Ursus americanus",
        weight_range: "126-550 lbs (57-250 kg)",
        height_range: "2.3-3 ft (70-90 cm) at shoulder",
        habitat: "Forests, swamps, mountains",
        conservation_status: "Least Concern",
        diet: "Omnivore - berries, nuts, insects, fish, small mammals",
        lifespan: "18-25 years in wild",
        description: "Medium-sized bear with black or brown fur, excellent tree climbers",
    },
    SpeciesProfile {
        name: "eastern cottontail rabbit",
        scientific_name: "Sylvilagus floridanus",
        weight_range: "2-4 lbs (0.9-1.8 kg)",
        height_range: "5-7 inches (12-18 cm)",
        habitat: "Meadows, farmlands, suburban areas",
        conservation_status: "Least Concern",
        diet: "Herbivore - grasses, vegetables, fruits",
        lifespan: "2-3 years in wild",
        description: "Small rabbit with grayish-brown fur and white tail underside",
    },
    SpeciesProfile {
        name: "eastern gray squirrel",
        scientific_name: "Sciurus carolinensis",
        weight_range: "14-21 oz (400-600 g)",
        height_range: "7-10 inches (18-25 cm)",
        habitat: "Deciduous forests, urban parks",
        conservation_status: "Least Concern",
        diet: "Omnivore - nuts, seeds, fruits, insects",
        lifespan: "6-12 years in wild",
        description: "Common tree squirrel with gray fur and bushy tail",
    },
    SpeciesProfile {
        name: "raccoon",
        scientific_name: "Procyon lotor",
        weight_range: "10-30 lbs (4.5-13.5 kg)",
        height_range: "9-12 inches (23-30 cm)",
        habitat: "Forests, marshes, urban areas",
        conservation_status: "Least Concern",
        diet: "Omnivore - fruits, nuts, insects, small animals",
        lifespan: "2-3 years in wild",
        description: "Medium-sized mammal with distinctive black mask and ringed tail",
    },
    SpeciesProfile {
        name: "coyote",
        scientific_name: "Canis latrans",
        weight_range: "20-50 lbs (9-23 kg)",
        height_range: "1.5-2 ft (45-60 cm)",
        habitat: "Grasslands, forests, urban areas",
        conservation_status: "Least Concern",
        diet: "Carnivore - small mammals, birds, fruits",
        lifespan: "10-14 years in wild",
        description: "Medium-sized canine with grayish-brown fur, adaptable to various environments",
    },
    SpeciesProfile {
        name: "mountain lion",
        scientific_name: "Puma concolor",
        weight_range: "75-175 lbs (34-80 kg)",
        height_range: "2-2.5 ft (60-75 cm)",
        habitat: "Mountains, forests, deserts",
        conservation_status: "Least Concern",
        diet: "Carnivore - deer, livestock, smaller mammals",
        lifespan: "8-13 years in wild",
        description: "Large cat with tawny coat, also known as cougar or puma",
    },
    SpeciesProfile {
        name: "bobcat",
        scientific_name: "Lynx rufus",
        weight_range: "15-35 lbs (7-16 kg)",
        height_range: "1.5-2 ft (45-60 cm)",
        habitat: "Forests, swamps, deserts",
        conservation_status: "Least Concern",
        diet: "Carnivore - rabbits, rodents, birds",
        lifespan: "7-10 years in wild",
        description: "Medium-sized cat with spotted coat and short bobbed tail",
    },
    SpeciesProfile {
        name: "great horned owl",
        scientific_name: "Bubo virginianus",
        weight_range: "2-5.5 lbs (0.9-2.5 kg)",
        height_range: "18-25 inches (46-63 cm)",
        habitat: "Forests, deserts, urban areas",
        conservation_status: "Least Concern",
        diet: "Carnivore - small mammals, birds",
        lifespan: "13-15 years in wild",
        description: "Large owl with prominent ear tufts, powerful predator",
    },
    SpeciesProfile {
        name: "bald eagle",
        scientific_name: "Haliaeetus leucocephalus",
        weight_range: "6.5-14 lbs (3-6.3 kg)",
        height_range: "2.3-3.3 ft (70-100 cm)",
        habitat: "Near bodies of water",
        conservation_status: "Least Concern",
        diet: "Carnivore - fish, small mammals, birds",
        lifespan: "20-30 years in wild",
        description: "Large bird of prey with white head and tail, national symbol of USA",
    },
    SpeciesProfile {
        name: "red-tailed hawk",
        scientific_name: "Buteo jamaicensis",
        weight_range: "1.5-3.5 lbs (0.7-1.6 kg)",
        height_range: "18-26 inches (45-65 cm)",
        habitat: "Open areas, woodlands",
        conservation_status: "Least Concern",
        diet: "Carnivore - small mammals, birds, reptiles",
        lifespan: "10-15 years in wild",
        description: "Common hawk with brick-red tail, often seen soaring",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_have_lowercase_names() {
        for profile in PROFILES {
            assert_eq!(profile.name, profile.name.to_lowercase());
        }
    }

    #[test]
    fn test_profiles_are_distinct() {
        let names: std::collections::BTreeSet<&str> =
            PROFILES.iter().map(|p| p.name).collect();
        assert_eq!(names.len(), PROFILES.len());
    }
}
